//! Session-scoped persistence for SDK state.
//!
//! The runtime persists its state into a session-scoped key/value store so
//! a page reload within the same session restores the checkout where it
//! left off. The store itself has no TTL; staleness is handled by the order
//! expiry policy in [`crate::order`].

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

/// Well-known session keys.
pub mod keys {
    /// Key for the persisted order/upsell state blob.
    pub const ORDER_STATE: &str = "next-order";
}

/// Session-scoped JSON key/value storage.
///
/// Implementations are expected to be cheap and synchronous; the runtime
/// writes through on every state mutation. Errors are deliberately absent
/// from the contract: a failed write must never break a checkout, so
/// implementations log and continue instead.
pub trait SessionStore: Send + Sync {
    /// Read a value, `None` if the key has never been written.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value under a key, replacing any previous value.
    fn insert(&self, key: &str, value: Value);

    /// Remove a key, if present.
    fn remove(&self, key: &str);
}

/// In-memory [`SessionStore`].
///
/// The default backing store for embedded and test use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn insert(&self, key: &str, value: Value) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get(keys::ORDER_STATE), None);

        store.insert(keys::ORDER_STATE, json!({"ref_id": "ord_1"}));
        assert_eq!(
            store.get(keys::ORDER_STATE),
            Some(json!({"ref_id": "ord_1"}))
        );
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        store.insert("k", json!(1));
        store.insert("k", json!(2));
        assert_eq!(store.get("k"), Some(json!(2)));
    }

    #[test]
    fn test_memory_store_remove() {
        let store = MemoryStore::new();
        store.insert("k", json!(true));
        store.remove("k");
        assert_eq!(store.get("k"), None);
    }
}
