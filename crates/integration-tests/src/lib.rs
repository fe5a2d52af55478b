//! Integration test support for the Next Checkout SDK.
//!
//! The tests exercise the order/upsell state machine through its public
//! surface with a scripted [`MockApi`] standing in for the checkout
//! backend. No live services are required.
//!
//! # Test Categories
//!
//! - `order_loading` - load coordinator, cache expiry, single-flight
//! - `upsell_flow` - upsell coordinator, journey tracking, reset

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use next_checkout::api::{
    ApiError, CheckoutApi, Order, OrderLine, PackageRef, UpsellLine, UpsellRequest,
};
use next_checkout::order::{OrderState, OrderStore};
use next_checkout::session::{MemoryStore, SessionStore, keys};
use next_checkout_core::{Amount, RefId};

// =============================================================================
// Mock API
// =============================================================================

/// Scripted response for one mock endpoint.
#[derive(Clone)]
pub enum Scripted {
    /// Respond with this order.
    Success(Order),
    /// Fail with an API error carrying this body.
    Failure(String),
}

/// Scripted [`CheckoutApi`] with call counters.
///
/// Each call yields back to the runtime once before answering, so
/// overlapping calls interleave the way real network calls would on a
/// current-thread runtime: the first caller suspends at the API boundary
/// and the second observes the guard flag.
pub struct MockApi {
    get_order_calls: AtomicUsize,
    add_upsell_calls: AtomicUsize,
    get_order_response: Mutex<Scripted>,
    add_upsell_response: Mutex<Scripted>,
}

impl MockApi {
    /// Mock whose endpoints both answer with `order`.
    #[must_use]
    pub fn with_order(order: Order) -> Self {
        Self {
            get_order_calls: AtomicUsize::new(0),
            add_upsell_calls: AtomicUsize::new(0),
            get_order_response: Mutex::new(Scripted::Success(order.clone())),
            add_upsell_response: Mutex::new(Scripted::Success(order)),
        }
    }

    /// Mock whose endpoints both fail with `message` as the error body.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            get_order_calls: AtomicUsize::new(0),
            add_upsell_calls: AtomicUsize::new(0),
            get_order_response: Mutex::new(Scripted::Failure(message.to_string())),
            add_upsell_response: Mutex::new(Scripted::Failure(message.to_string())),
        }
    }

    /// Re-script the order endpoint.
    pub fn script_get_order(&self, response: Scripted) {
        *self.get_order_response.lock().expect("mock lock") = response;
    }

    /// Re-script the upsell endpoint.
    pub fn script_add_upsell(&self, response: Scripted) {
        *self.add_upsell_response.lock().expect("mock lock") = response;
    }

    /// Number of `get_order` calls that reached the mock.
    #[must_use]
    pub fn get_order_calls(&self) -> usize {
        self.get_order_calls.load(Ordering::SeqCst)
    }

    /// Number of `add_upsell` calls that reached the mock.
    #[must_use]
    pub fn add_upsell_calls(&self) -> usize {
        self.add_upsell_calls.load(Ordering::SeqCst)
    }

    fn respond(script: &Mutex<Scripted>) -> Result<Order, ApiError> {
        match script.lock().expect("mock lock").clone() {
            Scripted::Success(order) => Ok(order),
            Scripted::Failure(message) => Err(ApiError::Api {
                status: 500,
                message,
            }),
        }
    }
}

impl CheckoutApi for MockApi {
    async fn get_order(&self, _ref_id: &RefId) -> Result<Order, ApiError> {
        self.get_order_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Self::respond(&self.get_order_response)
    }

    async fn add_upsell(
        &self,
        _ref_id: &RefId,
        _request: &UpsellRequest,
    ) -> Result<Order, ApiError> {
        self.add_upsell_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Self::respond(&self.add_upsell_response)
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Store over a fresh in-memory session, plus the session for persistence
/// assertions.
#[must_use]
pub fn fresh_store() -> (Arc<MemoryStore>, OrderStore) {
    let session = Arc::new(MemoryStore::new());
    let store = OrderStore::new(session.clone());
    (session, store)
}

/// Store restored from `state`, as if a previous page had persisted it.
#[must_use]
pub fn seeded_store(state: &OrderState) -> (Arc<MemoryStore>, OrderStore) {
    let session = Arc::new(MemoryStore::new());
    session.insert(
        keys::ORDER_STATE,
        serde_json::to_value(state).expect("serialize state"),
    );
    let store = OrderStore::new(session.clone());
    (session, store)
}

/// Order with one regular line and no upsell lines.
#[must_use]
pub fn basic_order(total: &str) -> Order {
    Order {
        lines: vec![regular_line("BASE-1", total)],
        total_incl_tax: Amount::new(total),
        supports_post_purchase_upsells: true,
    }
}

/// Order with one regular line plus an upsell line per SKU.
#[must_use]
pub fn order_with_upsell_skus(total: &str, skus: &[&str]) -> Order {
    let mut lines = vec![regular_line("BASE-1", total)];
    lines.extend(skus.iter().map(|sku| OrderLine {
        is_upsell: true,
        product_sku: (*sku).to_string(),
        product_title: "Bonus pack".to_string(),
        quantity: 1,
        unit_price_incl_tax: Amount::new("9.95"),
        line_total_incl_tax: Amount::new("9.95"),
    }));

    Order {
        lines,
        total_incl_tax: Amount::new(total),
        supports_post_purchase_upsells: true,
    }
}

/// Upsell request accepting one package per string id.
#[must_use]
pub fn upsell_request(package_ids: &[&str]) -> UpsellRequest {
    UpsellRequest {
        lines: package_ids
            .iter()
            .map(|id| UpsellLine {
                package_id: PackageRef::Text((*id).to_string()),
                quantity: 1,
            })
            .collect(),
    }
}

fn regular_line(sku: &str, total: &str) -> OrderLine {
    OrderLine {
        is_upsell: false,
        product_sku: sku.to_string(),
        product_title: "Starter kit".to_string(),
        quantity: 1,
        unit_price_incl_tax: Amount::new(total),
        line_total_incl_tax: Amount::new(total),
    }
}
