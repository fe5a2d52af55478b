//! The order/upsell state store.
//!
//! All mutations run as scoped transactions: lock, mutate, persist,
//! release. The session blob therefore never reflects a half-applied
//! mutation, and every operation is responsible for its own guard flag.
//! The two async coordinators set their flags in the same critical section
//! that checks them, before any await point, which makes duplicate
//! concurrent invocations observable no-ops.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use next_checkout_core::{PackageId, RefId};

use crate::api::{CheckoutApi, Order, UpsellRequest};
use crate::error::{OperationError, OperationKind};
use crate::order::state::{JourneyEntry, OrderState, PendingUpsell, completed_upsells_from};
use crate::session::{self, SessionStore};

/// Decision taken by the load coordinator's synchronous prologue.
enum LoadDecision {
    /// Cached order matches and is fresh; nothing to do.
    Fresh,
    /// Another load is already in flight.
    InFlight,
    /// Flags are set; proceed to the API call.
    Proceed,
}

/// Decision taken by the upsell coordinator's synchronous prologue.
enum UpsellDecision {
    /// No order reference to submit against.
    MissingRef,
    /// Another upsell submission is already in flight.
    InFlight,
    /// Flag is set; proceed to the API call with this reference.
    Proceed(RefId),
}

/// Store for the session's order/upsell state.
///
/// Cheaply cloneable handle over shared state; inject one per session
/// rather than holding a global. Construction restores previously
/// persisted state from the session store, and every mutation writes the
/// full state back through.
#[derive(Clone)]
pub struct OrderStore {
    inner: Arc<OrderStoreInner>,
}

struct OrderStoreInner {
    state: Mutex<OrderState>,
    session: Arc<dyn SessionStore>,
}

impl OrderStore {
    /// Create a store bound to a session, restoring previously persisted
    /// state when a valid blob exists under
    /// [`session::keys::ORDER_STATE`].
    ///
    /// An unreadable blob is discarded rather than trusted: the state falls
    /// back to its initial values.
    #[must_use]
    pub fn new(session: Arc<dyn SessionStore>) -> Self {
        let state = session
            .get(session::keys::ORDER_STATE)
            .and_then(|value| match serde_json::from_value(value) {
                Ok(state) => Some(state),
                Err(err) => {
                    warn!(error = %err, "Discarding unreadable order state blob");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            inner: Arc::new(OrderStoreInner {
                state: Mutex::new(state),
                session,
            }),
        }
    }

    // =========================================================================
    // Scoped Transactions
    // =========================================================================

    /// Run a mutation as a scoped transaction: lock, mutate, persist,
    /// release.
    fn transact<T>(&self, mutate: impl FnOnce(&mut OrderState) -> T) -> T {
        let mut state = self.lock_state();
        let result = mutate(&mut state);
        self.persist(&state);
        result
    }

    /// Read from the state without persisting.
    fn read<T>(&self, read: impl FnOnce(&OrderState) -> T) -> T {
        read(&self.lock_state())
    }

    fn lock_state(&self) -> MutexGuard<'_, OrderState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the state through to the session store.
    fn persist(&self, state: &OrderState) {
        match serde_json::to_value(state) {
            Ok(value) => self.inner.session.insert(session::keys::ORDER_STATE, value),
            Err(err) => warn!(error = %err, "Failed to serialize order state for session"),
        }
    }

    // =========================================================================
    // Order Loading
    // =========================================================================

    /// Load the order for `ref_id`, short-circuiting on a fresh cache.
    ///
    /// Completion is observed through the store: success replaces the
    /// order and resets upsell progress to what the order's own lines
    /// record; failure discards any stale order and records the error.
    /// This method itself never fails, and a duplicate call while a load
    /// is in flight is a no-op.
    #[instrument(skip(self, api), fields(ref_id = %ref_id))]
    pub async fn load_order<C: CheckoutApi>(&self, ref_id: &RefId, api: &C) {
        let now = Utc::now();
        let decision = self.transact(|state| {
            if state.order.is_some()
                && state.ref_id.as_ref() == Some(ref_id)
                && !state.is_expired(now)
            {
                return LoadDecision::Fresh;
            }
            if state.is_loading {
                return LoadDecision::InFlight;
            }

            state.is_loading = true;
            state.error = None;
            // The reference is written before the fetch resolves so the UI
            // can already reflect the target order.
            state.ref_id = Some(ref_id.clone());
            LoadDecision::Proceed
        });

        match decision {
            LoadDecision::Fresh => {
                debug!("Order already loaded and fresh; skipping fetch");
                return;
            }
            LoadDecision::InFlight => {
                warn!("Order load already in flight; ignoring duplicate request");
                return;
            }
            LoadDecision::Proceed => {}
        }

        match api.get_order(ref_id).await {
            Ok(order) => self.transact(|state| {
                let completed = completed_upsells_from(&order);
                state.order = Some(order);
                state.is_loading = false;
                // A processing flag left over from an aborted session must
                // not survive a fresh load.
                state.is_processing_upsell = false;
                state.error = None;
                state.order_loaded_at = Some(Utc::now());
                // The loaded order is authoritative for upsell progress.
                state.completed_upsells = completed;
                state.upsell_journey.clear();
                state.viewed_upsells.clear();
                state.viewed_upsell_pages.clear();
            }),
            Err(err) => {
                error!(error = %err, "Order load failed");
                self.transact(|state| {
                    state.is_loading = false;
                    state.error = Some(OperationError::from_api(OperationKind::LoadOrder, &err));
                    state.order = None;
                });
            }
        }
    }

    // =========================================================================
    // Upsell Application
    // =========================================================================

    /// Apply an upsell purchase to the current order.
    ///
    /// `page_path` is the upsell page the purchase was made from; it tags
    /// the journey entries and the completed-pages set. Returns the
    /// updated order, or `None` when the attempt was rejected or failed
    /// (the cause, if any, is recorded in the upsell error field). A
    /// failed submission leaves the current order untouched.
    #[instrument(skip(self, request, api), fields(page_path = %page_path))]
    pub async fn add_upsell<C: CheckoutApi>(
        &self,
        request: &UpsellRequest,
        page_path: &str,
        api: &C,
    ) -> Option<Order> {
        let decision = self.transact(|state| {
            let Some(ref_id) = state.ref_id.clone() else {
                state.upsell_error = Some(OperationError::missing_ref());
                return UpsellDecision::MissingRef;
            };
            if state.is_processing_upsell {
                return UpsellDecision::InFlight;
            }

            state.is_processing_upsell = true;
            state.upsell_error = None;
            UpsellDecision::Proceed(ref_id)
        });

        let ref_id = match decision {
            UpsellDecision::MissingRef => {
                warn!("Upsell attempted before an order reference was set");
                return None;
            }
            UpsellDecision::InFlight => {
                warn!("Upsell already being processed; ignoring duplicate submit");
                return None;
            }
            UpsellDecision::Proceed(ref_id) => ref_id,
        };

        match api.add_upsell(&ref_id, request).await {
            Ok(order) => Some(self.transact(|state| {
                let accepted: Vec<PackageId> = request
                    .lines
                    .iter()
                    .map(|line| line.package_id.to_package_id())
                    .collect();
                // One timestamp for the whole acceptance, shared by every
                // journey entry it produces.
                let now = Utc::now();

                state.upsell_journey.extend(
                    accepted
                        .iter()
                        .map(|id| JourneyEntry::accepted(id.clone(), page_path, now)),
                );
                state.order = Some(order.clone());
                state.is_processing_upsell = false;
                state.upsell_error = None;
                state.order_loaded_at = Some(now);
                // Accepted ids are appended, never deduplicated: a package
                // can legitimately be purchased again on a later offer.
                state.completed_upsells.extend(accepted);
                if !state
                    .completed_upsell_pages
                    .iter()
                    .any(|page| page == page_path)
                {
                    state.completed_upsell_pages.push(page_path.to_string());
                }
                order
            })),
            Err(err) => {
                error!(error = %err, "Upsell application failed");
                self.transact(|state| {
                    state.is_processing_upsell = false;
                    state.upsell_error =
                        Some(OperationError::from_api(OperationKind::AddUpsell, &err));
                });
                None
            }
        }
    }

    // =========================================================================
    // Journey Tracking
    // =========================================================================

    /// Record that an upsell package was shown to the customer.
    ///
    /// Idempotent: repeated views of the same package record once.
    pub fn mark_upsell_viewed(&self, package_id: &PackageId) {
        self.transact(|state| {
            if state.viewed_upsells.contains(package_id) {
                return;
            }
            state.viewed_upsells.push(package_id.clone());
            state
                .upsell_journey
                .push(JourneyEntry::viewed_package(package_id.clone(), Utc::now()));
        });
    }

    /// Record that an upsell page was shown to the customer.
    ///
    /// Idempotent for the page set and the journey. Always releases a
    /// stuck processing flag and clears the upsell error: navigating to a
    /// new upsell page is the manual recovery valve for a submission that
    /// never resolved.
    pub fn mark_upsell_page_viewed(&self, page_path: &str) {
        self.transact(|state| {
            state.is_processing_upsell = false;
            state.upsell_error = None;

            if state.viewed_upsell_pages.iter().any(|page| page == page_path) {
                return;
            }
            state.viewed_upsell_pages.push(page_path.to_string());
            state
                .upsell_journey
                .push(JourneyEntry::viewed_page(page_path, Utc::now()));
        });
    }

    /// Record that the customer declined an upsell offer.
    ///
    /// Not deduplicated: skipping the same offer twice records twice.
    /// Releases a stuck processing flag the same way
    /// [`Self::mark_upsell_page_viewed`] does.
    pub fn mark_upsell_skipped(&self, package_id: Option<&PackageId>, page_path: Option<&str>) {
        self.transact(|state| {
            state.is_processing_upsell = false;
            state.upsell_error = None;
            state.upsell_journey.push(JourneyEntry::skipped(
                package_id.cloned(),
                page_path.map(ToString::to_string),
                Utc::now(),
            ));
        });
    }

    /// Mark a package completed outside the accept path.
    ///
    /// Unlike acceptance through [`Self::add_upsell`], this is
    /// dedup-checked.
    pub fn mark_upsell_completed(&self, package_id: &PackageId) {
        self.transact(|state| {
            if state.completed_upsells.contains(package_id) {
                return;
            }
            state.completed_upsells.push(package_id.clone());
        });
    }

    // =========================================================================
    // Pending Upsells
    // =========================================================================

    /// Queue an upsell intent for later submission.
    ///
    /// Returns the handle to remove it with. Queued intents are never
    /// submitted automatically.
    pub fn queue_upsell(&self, request: UpsellRequest) -> Uuid {
        self.transact(|state| {
            let id = Uuid::new_v4();
            state.pending_upsells.push(PendingUpsell { id, request });
            id
        })
    }

    /// Remove a queued upsell intent. Returns whether it was present.
    pub fn remove_pending_upsell(&self, id: Uuid) -> bool {
        self.transact(|state| {
            let before = state.pending_upsells.len();
            state.pending_upsells.retain(|pending| pending.id != id);
            state.pending_upsells.len() != before
        })
    }

    /// Drop all queued upsell intents.
    pub fn clear_pending_upsells(&self) {
        self.transact(|state| state.pending_upsells.clear());
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the full state.
    #[must_use]
    pub fn snapshot(&self) -> OrderState {
        self.read(Clone::clone)
    }

    /// The current order, if one is loaded.
    #[must_use]
    pub fn order(&self) -> Option<Order> {
        self.read(|state| state.order.clone())
    }

    /// The session's order reference.
    #[must_use]
    pub fn ref_id(&self) -> Option<RefId> {
        self.read(|state| state.ref_id.clone())
    }

    /// Whether a load is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.read(|state| state.is_loading)
    }

    /// Whether an upsell submission is in flight.
    #[must_use]
    pub fn is_processing_upsell(&self) -> bool {
        self.read(|state| state.is_processing_upsell)
    }

    /// Last load failure, if the most recent load attempt failed.
    #[must_use]
    pub fn error(&self) -> Option<OperationError> {
        self.read(|state| state.error.clone())
    }

    /// Last upsell failure, if the most recent attempt failed.
    #[must_use]
    pub fn upsell_error(&self) -> Option<OperationError> {
        self.read(|state| state.upsell_error.clone())
    }

    /// Whether a purchase has been completed on `page_path`.
    #[must_use]
    pub fn has_page_completed(&self, page_path: &str) -> bool {
        self.read(|state| {
            state
                .completed_upsell_pages
                .iter()
                .any(|page| page == page_path)
        })
    }

    /// Whether `package_id` has been shown to the customer.
    #[must_use]
    pub fn has_been_viewed(&self, package_id: &PackageId) -> bool {
        self.read(|state| state.viewed_upsells.contains(package_id))
    }

    /// Whether `page_path` has been shown to the customer.
    #[must_use]
    pub fn has_page_been_viewed(&self, page_path: &str) -> bool {
        self.read(|state| {
            state
                .viewed_upsell_pages
                .iter()
                .any(|page| page == page_path)
        })
    }

    /// The loaded order's total including tax.
    ///
    /// Zero when no order is loaded or its total does not parse.
    #[must_use]
    pub fn order_total(&self) -> Decimal {
        self.read(|state| {
            state
                .order
                .as_ref()
                .and_then(|order| order.total_incl_tax.to_decimal())
                .unwrap_or_default()
        })
    }

    /// Whether upsells can be offered right now: an order is loaded, it
    /// supports post-purchase upsells, and no submission is in flight.
    #[must_use]
    pub fn can_add_upsells(&self) -> bool {
        self.read(|state| {
            state
                .order
                .as_ref()
                .is_some_and(|order| order.supports_post_purchase_upsells)
                && !state.is_processing_upsell
        })
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Restore the documented initial values and persist them.
    pub fn reset(&self) {
        self.transact(|state| *state = OrderState::default());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use next_checkout_core::Amount;

    use crate::api::{OrderLine, PackageRef, UpsellLine};
    use crate::error::OperationKind;
    use crate::session::MemoryStore;

    use super::*;

    fn fresh_store() -> (Arc<MemoryStore>, OrderStore) {
        let session = Arc::new(MemoryStore::new());
        let store = OrderStore::new(session.clone());
        (session, store)
    }

    fn seeded_store(state: &OrderState) -> OrderStore {
        let session = Arc::new(MemoryStore::new());
        session.insert(
            session::keys::ORDER_STATE,
            serde_json::to_value(state).expect("serialize"),
        );
        OrderStore::new(session)
    }

    fn sample_order(total: &str) -> Order {
        Order {
            lines: vec![OrderLine {
                is_upsell: false,
                product_sku: "BASE-1".to_string(),
                product_title: "Starter kit".to_string(),
                quantity: 1,
                unit_price_incl_tax: Amount::new(total),
                line_total_incl_tax: Amount::new(total),
            }],
            total_incl_tax: Amount::new(total),
            supports_post_purchase_upsells: true,
        }
    }

    fn upsell_request(package_id: &str) -> UpsellRequest {
        UpsellRequest {
            lines: vec![UpsellLine {
                package_id: PackageRef::Text(package_id.to_string()),
                quantity: 1,
            }],
        }
    }

    #[test]
    fn test_restore_from_session_blob() {
        let persisted = OrderState {
            ref_id: Some(RefId::new("ord_1")),
            completed_upsells: vec![PackageId::new("5")],
            ..OrderState::default()
        };
        let store = seeded_store(&persisted);

        assert_eq!(store.ref_id(), Some(RefId::new("ord_1")));
        assert_eq!(store.snapshot().completed_upsells, vec![PackageId::new("5")]);
    }

    #[test]
    fn test_restore_discards_invalid_blob() {
        let session = Arc::new(MemoryStore::new());
        session.insert(session::keys::ORDER_STATE, serde_json::json!(42));
        let store = OrderStore::new(session);

        assert_eq!(store.snapshot(), OrderState::default());
    }

    #[test]
    fn test_mutations_write_through() {
        let (session, store) = fresh_store();
        store.mark_upsell_viewed(&PackageId::new("3"));

        let blob = session
            .get(session::keys::ORDER_STATE)
            .expect("state persisted");
        let persisted: OrderState = serde_json::from_value(blob).expect("deserialize");
        assert_eq!(persisted, store.snapshot());
        assert_eq!(persisted.viewed_upsells, vec![PackageId::new("3")]);
    }

    #[test]
    fn test_mark_viewed_is_idempotent() {
        let (_, store) = fresh_store();
        store.mark_upsell_viewed(&PackageId::new("3"));
        store.mark_upsell_viewed(&PackageId::new("3"));

        let state = store.snapshot();
        assert_eq!(state.viewed_upsells, vec![PackageId::new("3")]);
        assert_eq!(state.upsell_journey.len(), 1);
        assert!(store.has_been_viewed(&PackageId::new("3")));
        assert!(!store.has_been_viewed(&PackageId::new("4")));
    }

    #[test]
    fn test_mark_page_viewed_is_idempotent_and_releases_flag() {
        let stuck = OrderState {
            is_processing_upsell: true,
            upsell_error: Some(OperationError::with_message(
                OperationKind::AddUpsell,
                "declined",
            )),
            ..OrderState::default()
        };
        let store = seeded_store(&stuck);

        store.mark_upsell_page_viewed("/upsell-2");

        let state = store.snapshot();
        assert!(!state.is_processing_upsell);
        assert_eq!(state.upsell_error, None);
        assert_eq!(state.upsell_journey.len(), 1);
        assert!(store.has_page_been_viewed("/upsell-2"));

        // Second view of the same page records nothing new
        store.mark_upsell_page_viewed("/upsell-2");
        assert_eq!(store.snapshot().upsell_journey.len(), 1);
    }

    #[test]
    fn test_mark_skipped_records_duplicates_and_releases_flag() {
        let stuck = OrderState {
            is_processing_upsell: true,
            ..OrderState::default()
        };
        let store = seeded_store(&stuck);

        store.mark_upsell_skipped(Some(&PackageId::new("9")), Some("/upsell-1"));
        store.mark_upsell_skipped(Some(&PackageId::new("9")), Some("/upsell-1"));

        let state = store.snapshot();
        assert!(!state.is_processing_upsell);
        assert_eq!(state.upsell_journey.len(), 2);
    }

    #[test]
    fn test_mark_completed_is_dedup_checked() {
        let (_, store) = fresh_store();
        store.mark_upsell_completed(&PackageId::new("5"));
        store.mark_upsell_completed(&PackageId::new("5"));

        assert_eq!(store.snapshot().completed_upsells, vec![PackageId::new("5")]);
    }

    #[test]
    fn test_pending_upsell_queue() {
        let (_, store) = fresh_store();
        let first = store.queue_upsell(upsell_request("1"));
        store.queue_upsell(upsell_request("2"));
        assert_eq!(store.snapshot().pending_upsells.len(), 2);

        assert!(store.remove_pending_upsell(first));
        assert!(!store.remove_pending_upsell(first));
        assert_eq!(store.snapshot().pending_upsells.len(), 1);

        store.clear_pending_upsells();
        assert!(store.snapshot().pending_upsells.is_empty());
    }

    #[test]
    fn test_order_total_defaults_to_zero() {
        let (_, store) = fresh_store();
        assert_eq!(store.order_total(), Decimal::ZERO);

        let store = seeded_store(&OrderState {
            order: Some(sample_order("not-a-number")),
            ..OrderState::default()
        });
        assert_eq!(store.order_total(), Decimal::ZERO);

        let store = seeded_store(&OrderState {
            order: Some(sample_order("42.50")),
            ..OrderState::default()
        });
        assert_eq!(store.order_total(), Decimal::new(4250, 2));
    }

    #[test]
    fn test_can_add_upsells_conditions() {
        let (_, store) = fresh_store();
        assert!(!store.can_add_upsells());

        let mut unsupported = sample_order("10.00");
        unsupported.supports_post_purchase_upsells = false;
        let store = seeded_store(&OrderState {
            order: Some(unsupported),
            ..OrderState::default()
        });
        assert!(!store.can_add_upsells());

        let store = seeded_store(&OrderState {
            order: Some(sample_order("10.00")),
            ..OrderState::default()
        });
        assert!(store.can_add_upsells());

        let store = seeded_store(&OrderState {
            order: Some(sample_order("10.00")),
            is_processing_upsell: true,
            ..OrderState::default()
        });
        assert!(!store.can_add_upsells());
    }

    #[test]
    fn test_reset_restores_initial_values() {
        let populated = OrderState {
            order: Some(sample_order("10.00")),
            ref_id: Some(RefId::new("ord_1")),
            order_loaded_at: Some(Utc::now()),
            is_loading: true,
            is_processing_upsell: true,
            error: Some(OperationError::with_message(
                OperationKind::LoadOrder,
                "boom",
            )),
            upsell_error: Some(OperationError::with_message(
                OperationKind::AddUpsell,
                "boom",
            )),
            completed_upsells: vec![PackageId::new("5")],
            completed_upsell_pages: vec!["/upsell-1".to_string()],
            viewed_upsells: vec![PackageId::new("5")],
            viewed_upsell_pages: vec!["/upsell-1".to_string()],
            upsell_journey: vec![JourneyEntry::viewed_page("/upsell-1", Utc::now())],
            ..OrderState::default()
        };
        let store = seeded_store(&populated);

        store.reset();

        assert_eq!(store.snapshot(), OrderState::default());
    }
}
