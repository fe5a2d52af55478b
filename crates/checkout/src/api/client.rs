//! `reqwest` implementation of the checkout backend API.
//!
//! Plain REST/JSON: orders are fetched and mutated under
//! `/api/{version}/orders/{ref}`.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::instrument;

use next_checkout_core::RefId;

use crate::config::CheckoutApiConfig;

use super::{ApiError, CheckoutApi, Order, UpsellRequest};

/// Client for the checkout backend REST API.
///
/// Cheaply cloneable; all operations take `&self`.
#[derive(Clone)]
pub struct CheckoutClient {
    client: reqwest::Client,
    endpoint: String,
}

impl CheckoutClient {
    /// Create a new checkout API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the token is
    /// not a valid header value.
    pub fn new(config: &CheckoutApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        // Private tokens are server-side only; never ship them to a browser
        let auth_value = format!("Bearer {}", config.api_token.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| ApiError::Parse(format!("Invalid API token format: {e}")))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let endpoint = format!(
            "{}/api/{}",
            config.base_url.trim_end_matches('/'),
            config.api_version
        );

        Ok(Self { client, endpoint })
    }

    /// Map rate-limit and error statuses, passing successful responses through.
    async fn check_response(
        response: reqwest::Response,
        ref_id: &RefId,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(ref_id.to_string()));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

impl CheckoutApi for CheckoutClient {
    #[instrument(skip(self), fields(ref_id = %ref_id))]
    async fn get_order(&self, ref_id: &RefId) -> Result<Order, ApiError> {
        let url = format!(
            "{}/orders/{}",
            self.endpoint,
            urlencoding::encode(ref_id.as_str())
        );

        let response = self.client.get(&url).send().await?;
        let response = Self::check_response(response, ref_id).await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    #[instrument(skip(self, request), fields(ref_id = %ref_id))]
    async fn add_upsell(&self, ref_id: &RefId, request: &UpsellRequest) -> Result<Order, ApiError> {
        let url = format!(
            "{}/orders/{}/upsells",
            self.endpoint,
            urlencoding::encode(ref_id.as_str())
        );

        let response = self.client.post(&url).json(request).send().await?;
        let response = Self::check_response(response, ref_id).await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}
