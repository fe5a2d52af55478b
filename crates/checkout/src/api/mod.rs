//! Checkout backend API client.
//!
//! # Architecture
//!
//! - The backend is the source of truth for orders - the runtime never
//!   patches an order locally, it replaces it wholesale with the API's
//!   response
//! - [`CheckoutApi`] is the seam between the state machine and the
//!   transport; [`CheckoutClient`] is the production `reqwest`
//!   implementation
//!
//! # Example
//!
//! ```rust,ignore
//! use next_checkout::api::{CheckoutApi, CheckoutClient};
//! use next_checkout::config::CheckoutApiConfig;
//!
//! let config = CheckoutApiConfig::from_env()?;
//! let client = CheckoutClient::new(&config)?;
//!
//! let order = client.get_order(&"ord_8f3a".into()).await?;
//! ```

mod client;
pub mod types;

pub use client::CheckoutClient;
pub use types::*;

use std::future::Future;

use thiserror::Error;

use next_checkout_core::RefId;

/// Errors that can occur when calling the checkout backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Order not found.
    #[error("Order not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Capability contract the order state machine requires from the backend.
///
/// The two operations are the only suspension points in the runtime; every
/// other state mutation is synchronous.
pub trait CheckoutApi {
    /// Fetch an order by its reference id.
    fn get_order(
        &self,
        ref_id: &RefId,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;

    /// Apply an upsell purchase to an order, returning the updated order.
    fn add_upsell(
        &self,
        ref_id: &RefId,
        request: &UpsellRequest,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;
}
