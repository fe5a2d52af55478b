//! Next Checkout Core - Shared types library.
//!
//! This crate provides common types used across the Next Checkout SDK:
//! - `checkout` - the embeddable order/upsell runtime
//! - `integration-tests` - black-box tests over the runtime
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and monetary amounts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
