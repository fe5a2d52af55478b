//! Core types for Next Checkout.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod amount;
pub mod id;

pub use amount::Amount;
pub use id::*;
