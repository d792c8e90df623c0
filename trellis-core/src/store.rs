//! Key-value stores for persisted state.
//!
//! [`Persisted`](crate::primitives::Persisted) never reaches for ambient
//! storage. It is handed a [`KeyValueStore`], which keeps it testable with
//! [`MemoryStore`] and lets callers plug in whatever durable backend they own.

use dashmap::DashMap;

/// A string-keyed store of string values.
///
/// Implementations are expected to be synchronous: `set` returning means a
/// subsequent `get` of the same key sees the new value.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String);
}

/// In-memory storage for testing and local development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the value under `key`, returning it.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.remove(key).map(|(_, value)| value)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|value| value.value().clone())
    }

    fn set(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_values() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("theme"), None);

        store.set("theme", "\"dark\"".to_string());
        store.set("theme", "\"light\"".to_string());

        assert_eq!(store.get("theme").as_deref(), Some("\"light\""));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove("theme").as_deref(), Some("\"light\""));
        assert!(store.is_empty());
    }
}
