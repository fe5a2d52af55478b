//! The order/upsell state aggregate and its derivation rules.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use next_checkout_core::{PackageId, RefId};

use crate::api::{Order, UpsellRequest};
use crate::error::OperationError;

/// How long a loaded order stays fresh before the next load refetches (15 minutes).
pub const ORDER_TTL_MS: i64 = 15 * 60 * 1000;

/// First run of digits in an upsell SKU, e.g. `"PKG-12-X"` -> `12`.
static SKU_DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid regex"));

// =============================================================================
// Journey Types
// =============================================================================

/// What the customer did with an upsell offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JourneyAction {
    /// The offer was purchased.
    Accepted,
    /// The offer (or its page) was shown.
    Viewed,
    /// The offer was declined.
    Skipped,
}

/// One immutable record of a customer interacting with an upsell offer.
///
/// Entries are only ever appended; the log is cleared as a whole when an
/// order load makes it stale, or by a full reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyEntry {
    /// Package the interaction concerned, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<PackageId>,
    /// Page the interaction happened on, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_path: Option<String>,
    /// The recorded interaction.
    pub action: JourneyAction,
    /// When the interaction was recorded.
    pub timestamp: DateTime<Utc>,
}

impl JourneyEntry {
    /// Entry for a package accepted on a given page.
    #[must_use]
    pub fn accepted(package_id: PackageId, page_path: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            package_id: Some(package_id),
            page_path: Some(page_path.to_string()),
            action: JourneyAction::Accepted,
            timestamp,
        }
    }

    /// Entry for a viewed package.
    #[must_use]
    pub const fn viewed_package(package_id: PackageId, timestamp: DateTime<Utc>) -> Self {
        Self {
            package_id: Some(package_id),
            page_path: None,
            action: JourneyAction::Viewed,
            timestamp,
        }
    }

    /// Entry for a viewed page.
    #[must_use]
    pub fn viewed_page(page_path: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            package_id: None,
            page_path: Some(page_path.to_string()),
            action: JourneyAction::Viewed,
            timestamp,
        }
    }

    /// Entry for a skipped offer; either side may be unknown.
    #[must_use]
    pub const fn skipped(
        package_id: Option<PackageId>,
        page_path: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            package_id,
            page_path,
            action: JourneyAction::Skipped,
            timestamp,
        }
    }
}

/// A queued upsell intent that has not been submitted yet.
///
/// Queued intents are never auto-submitted; pages add, remove, and clear
/// them explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpsell {
    /// Client-generated handle so queued intents can be removed individually.
    pub id: Uuid,
    /// The request that would be submitted.
    pub request: UpsellRequest,
}

// =============================================================================
// OrderState
// =============================================================================

/// Aggregate state for the order/upsell flow.
///
/// Serialized verbatim into the session store after every mutation and
/// restored on store construction. Missing fields deserialize to their
/// initial values, so older or partial blobs degrade gracefully instead of
/// failing the whole restore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderState {
    /// The current order; replaced wholesale by API responses.
    pub order: Option<Order>,
    /// The session's order reference. Written before a load resolves so
    /// the UI can already reflect the target order during the fetch.
    pub ref_id: Option<RefId>,
    /// When the order was last loaded or mutated through an upsell.
    pub order_loaded_at: Option<DateTime<Utc>>,
    /// Guard flag for the load coordinator.
    pub is_loading: bool,
    /// Guard flag for the upsell coordinator.
    pub is_processing_upsell: bool,
    /// Last load failure.
    pub error: Option<OperationError>,
    /// Last upsell failure.
    pub upsell_error: Option<OperationError>,
    /// Queued upsell intents.
    pub pending_upsells: Vec<PendingUpsell>,
    /// Accepted package ids in display order; duplicates allowed on the
    /// accept path.
    pub completed_upsells: Vec<PackageId>,
    /// Upsell pages a purchase was completed on.
    pub completed_upsell_pages: Vec<String>,
    /// Upsell packages that have been shown.
    pub viewed_upsells: Vec<PackageId>,
    /// Upsell pages that have been shown.
    pub viewed_upsell_pages: Vec<String>,
    /// Append-only log of upsell interactions.
    pub upsell_journey: Vec<JourneyEntry>,
}

impl OrderState {
    /// Whether the cached order is stale.
    ///
    /// True when no order has ever been loaded, or the last load is older
    /// than [`ORDER_TTL_MS`]. Evaluated fresh on every call.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.order_loaded_at
            .is_none_or(|loaded_at| (now - loaded_at).num_milliseconds() > ORDER_TTL_MS)
    }
}

// =============================================================================
// Derivations
// =============================================================================

/// Derive the package id encoded in an upsell line's SKU.
///
/// Takes the first run of digits; a SKU without digits falls back to the
/// raw SKU string.
#[must_use]
pub fn package_id_from_sku(sku: &str) -> PackageId {
    SKU_DIGITS_RE
        .find(sku)
        .map_or_else(|| PackageId::new(sku), |m| PackageId::new(m.as_str()))
}

/// Package ids recorded in an order's own upsell lines, in line order.
///
/// A freshly loaded order is authoritative: this list replaces whatever the
/// session believed before.
#[must_use]
pub fn completed_upsells_from(order: &Order) -> Vec<PackageId> {
    order
        .lines
        .iter()
        .filter(|line| line.is_upsell)
        .map(|line| package_id_from_sku(&line.product_sku))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use next_checkout_core::Amount;

    use crate::api::OrderLine;

    use super::*;

    fn upsell_line(sku: &str) -> OrderLine {
        OrderLine {
            is_upsell: true,
            product_sku: sku.to_string(),
            product_title: "Bonus pack".to_string(),
            quantity: 1,
            unit_price_incl_tax: Amount::new("9.95"),
            line_total_incl_tax: Amount::new("9.95"),
        }
    }

    fn order_with_lines(lines: Vec<OrderLine>) -> Order {
        Order {
            lines,
            total_incl_tax: Amount::new("9.95"),
            supports_post_purchase_upsells: true,
        }
    }

    #[test]
    fn test_never_loaded_is_expired() {
        let state = OrderState::default();
        assert!(state.is_expired(Utc::now()));
    }

    #[test]
    fn test_recent_load_is_fresh() {
        let now = Utc::now();
        let state = OrderState {
            order_loaded_at: Some(now - Duration::minutes(14)),
            ..OrderState::default()
        };
        assert!(!state.is_expired(now));
    }

    #[test]
    fn test_old_load_is_expired() {
        let now = Utc::now();
        let state = OrderState {
            order_loaded_at: Some(now - Duration::minutes(16)),
            ..OrderState::default()
        };
        assert!(state.is_expired(now));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        // Exactly 15 minutes old is still fresh; the policy is strictly
        // greater-than.
        let now = Utc::now();
        let state = OrderState {
            order_loaded_at: Some(now - Duration::milliseconds(ORDER_TTL_MS)),
            ..OrderState::default()
        };
        assert!(!state.is_expired(now));
        assert!(state.is_expired(now + Duration::milliseconds(1)));
    }

    #[test]
    fn test_sku_digit_extraction() {
        assert_eq!(package_id_from_sku("PKG-12-X"), PackageId::new("12"));
        assert_eq!(package_id_from_sku("ABC789"), PackageId::new("789"));
        // First run of digits wins
        assert_eq!(package_id_from_sku("A1B22"), PackageId::new("1"));
    }

    #[test]
    fn test_sku_without_digits_falls_back_to_raw() {
        assert_eq!(
            package_id_from_sku("NO-DIGITS"),
            PackageId::new("NO-DIGITS")
        );
    }

    #[test]
    fn test_completed_upsells_skip_regular_lines() {
        let mut regular = upsell_line("BASE-1");
        regular.is_upsell = false;
        let order = order_with_lines(vec![regular, upsell_line("PKG-12-X"), upsell_line("PKG-7")]);

        assert_eq!(
            completed_upsells_from(&order),
            vec![PackageId::new("12"), PackageId::new("7")]
        );
    }

    #[test]
    fn test_state_deserializes_partial_blob() {
        // Older session blobs may miss fields entirely; they must restore
        // to initial values rather than fail.
        let state: OrderState =
            serde_json::from_str(r#"{"ref_id": "ord_1", "is_loading": true}"#).expect("deserialize");

        assert_eq!(state.ref_id, Some(RefId::new("ord_1")));
        assert!(state.is_loading);
        assert_eq!(state.order, None);
        assert!(state.upsell_journey.is_empty());
    }
}
