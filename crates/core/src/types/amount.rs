//! Decimal-as-string monetary amounts.
//!
//! Checkout backends serialize money as decimal strings to preserve
//! precision across languages. [`Amount`] keeps the raw wire representation
//! and converts to [`Decimal`] on demand.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount carried as a decimal string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(String);

impl Amount {
    /// Create an amount from its wire representation.
    #[must_use]
    pub fn new(amount: impl Into<String>) -> Self {
        Self(amount.into())
    }

    /// Get the raw wire string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into a [`Decimal`].
    ///
    /// Returns `None` when the string is not a valid decimal number.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        Decimal::from_str(&self.0).ok()
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Amount {
    fn from(amount: String) -> Self {
        Self(amount)
    }
}

impl From<&str> for Amount {
    fn from(amount: &str) -> Self {
        Self(amount.to_string())
    }
}
