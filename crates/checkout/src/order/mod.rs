//! The order/upsell state machine.
//!
//! # Architecture
//!
//! - [`OrderState`] is the aggregate: current order, reference id, guard
//!   flags, errors, and journey data
//! - [`OrderStore`] owns the aggregate and exposes every operation that may
//!   mutate it; mutations run as scoped transactions (lock, mutate,
//!   persist, release)
//! - The load and upsell coordinators are single-flight: each sets its
//!   guard flag in the same critical section that checks it, before any
//!   await point
//!
//! # State machine
//!
//! `EMPTY -> LOADING -> LOADED` on the happy path; a failed load discards
//! the order but keeps the reference id. From `LOADED`, an upsell attempt
//! round-trips through `UPSELL_PROCESSING` and back, replacing the order on
//! success and leaving it untouched on failure. [`OrderStore::reset`]
//! returns any state to `EMPTY`.

mod state;
mod store;

pub use state::{JourneyAction, JourneyEntry, ORDER_TTL_MS, OrderState, PendingUpsell};
pub use store::OrderStore;
