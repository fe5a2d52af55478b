//! Next Checkout - client-side checkout SDK runtime.
//!
//! This crate is the embeddable runtime behind a storefront checkout: it
//! owns the session's order/upsell state and the guarantees around it. A
//! customer can double-click an upsell button, a page can reload mid-fetch,
//! and the order reference must never be lost or mutated concurrently.
//!
//! # Architecture
//!
//! - [`order`] - the order/upsell state machine ([`OrderStore`]) with
//!   single-flight load and upsell coordinators, journey tracking, and a
//!   15-minute order staleness policy
//! - [`api`] - the checkout backend contract ([`api::CheckoutApi`]) and its
//!   `reqwest` implementation
//! - [`session`] - session-scoped persistence; state is written through on
//!   every mutation and restored on construction
//! - [`config`] - environment-variable configuration
//! - [`telemetry`] - opt-in tracing setup for embedding hosts
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use next_checkout::api::CheckoutClient;
//! use next_checkout::config::CheckoutApiConfig;
//! use next_checkout::order::OrderStore;
//! use next_checkout::session::MemoryStore;
//!
//! let config = CheckoutApiConfig::from_env()?;
//! let client = CheckoutClient::new(&config)?;
//! let store = OrderStore::new(Arc::new(MemoryStore::new()));
//!
//! store.load_order(&"ord_8f3a".into(), &client).await;
//! if store.can_add_upsells() {
//!     // render the first upsell page
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod order;
pub mod session;
pub mod telemetry;

pub use error::{OperationError, OperationKind};
pub use order::{OrderState, OrderStore};
