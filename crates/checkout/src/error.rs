//! Typed operation errors surfaced through the order state.
//!
//! Failures of the load and upsell coordinators never propagate to their
//! callers; they are converted into an [`OperationError`] stored on the
//! state and rendered for direct display in the checkout UI.

use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// The operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Fetching an order by reference id.
    LoadOrder,
    /// Applying an upsell purchase to an order.
    AddUpsell,
}

impl OperationKind {
    /// Generic fallback message shown when a failure carries no detail.
    #[must_use]
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Self::LoadOrder => "Failed to load order",
            Self::AddUpsell => "Failed to add upsell",
        }
    }
}

/// A failed load or upsell operation, as surfaced through the state.
///
/// The display form is intended to be shown to the customer verbatim: the
/// carried message when the failure provided one, otherwise the generic
/// fallback for the operation kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    /// Which operation failed.
    pub kind: OperationKind,
    /// Human-readable failure detail, if the source provided one.
    pub message: Option<String>,
}

impl OperationError {
    /// Error with a specific display message.
    #[must_use]
    pub fn with_message(kind: OperationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    /// Build from an API failure, keeping its message for display.
    ///
    /// An error whose body was empty carries no message and falls back to
    /// the generic string for `kind`.
    #[must_use]
    pub fn from_api(kind: OperationKind, error: &ApiError) -> Self {
        let message = match error {
            ApiError::Api { message, .. } if message.trim().is_empty() => None,
            _ => Some(error.to_string()),
        };
        Self { kind, message }
    }

    /// Error for an upsell attempted before an order reference exists.
    #[must_use]
    pub fn missing_ref() -> Self {
        Self::with_message(
            OperationKind::AddUpsell,
            "No order reference available - load an order before adding upsells",
        )
    }
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => f.write_str(self.kind.fallback_message()),
        }
    }
}

impl std::error::Error for OperationError {}
