//! Durable store adapter.
//!
//! A signal that is hydrated from a [`KeyValueStore`] when created and
//! written back to it by every `set`. The store is written before the signal
//! commits, so it never lags the value, even inside a batch or an effect body.
//!
//! Values are stored as JSON. A stored record that is missing or does not
//! decode is ignored in favor of the default. Writes are encoded before they
//! touch anything, so a value that cannot be encoded is rejected with the
//! in-memory state and the store both left as they were.
//!
//! Only one adapter per key is supported; two adapters sharing a key
//! overwrite each other in whatever order their writes land.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::reactive::{ReadSignal, Signal};
use crate::store::KeyValueStore;

/// A signal persisted under a key in a [`KeyValueStore`].
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(MemoryStore::new());
/// let theme = Persisted::new("theme", "light".to_string(), store.clone());
/// theme.set("dark".to_string())?;
///
/// // Later, or elsewhere:
/// let theme = Persisted::new("theme", "light".to_string(), store);
/// assert_eq!(theme.get(), "dark");
/// ```
pub struct Persisted<T>
where
    T: Clone + Send + Sync + PartialEq + Serialize + DeserializeOwned + 'static,
{
    key: String,
    default: T,
    state: Signal<T>,
    store: Arc<dyn KeyValueStore>,
    detached: AtomicBool,
}

impl<T> Persisted<T>
where
    T: Clone + Send + Sync + PartialEq + Serialize + DeserializeOwned + 'static,
{
    /// Create the adapter, preferring a well-formed stored value over `default`.
    pub fn new(key: impl Into<String>, default: T, store: Arc<dyn KeyValueStore>) -> Self {
        let key = key.into();
        let initial = hydrate(&key, store.as_ref()).unwrap_or_else(|| default.clone());
        match serde_json::to_string(&initial) {
            Ok(encoded) => store.set(&key, encoded),
            Err(err) => tracing::warn!(%key, %err, "initial value not persisted"),
        }

        Self {
            key,
            default,
            state: Signal::new(initial),
            store,
            detached: AtomicBool::new(false),
        }
    }

    /// The storage key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The current value (tracked).
    pub fn get(&self) -> T {
        self.state.get()
    }

    /// Read-only view of the value.
    pub fn state(&self) -> ReadSignal<T> {
        self.state.read_only()
    }

    /// Replace the value and persist it.
    ///
    /// Fails without changing anything if `value` cannot be encoded.
    pub fn set(&self, value: T) -> Result<()> {
        let encoded = serde_json::to_string(&value)?;
        if !self.detached.load(Ordering::Acquire) {
            self.store.set(&self.key, encoded);
            tracing::trace!(key = %self.key, "persisted");
        }
        self.state.set(value);
        Ok(())
    }

    /// Replace the value with `f(current)` and persist it.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.state.get_untracked());
        self.set(next)
    }

    /// Restore the default given at construction, not the hydrated value.
    pub fn reset(&self) -> Result<()> {
        self.set(self.default.clone())
    }

    /// The raw record currently in the store.
    pub fn stored(&self) -> Option<String> {
        self.store.get(&self.key)
    }

    /// Stop writing to the store. The in-memory value stays usable.
    pub fn dispose(&self) {
        self.detached.store(true, Ordering::Release);
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}

fn hydrate<T: DeserializeOwned>(key: &str, store: &dyn KeyValueStore) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => {
            tracing::debug!(%key, "hydrated from store");
            Some(value)
        }
        Err(err) => {
            tracing::warn!(%key, %err, "stored value is malformed, using default");
            None
        }
    }
}

impl<T> std::fmt::Debug for Persisted<T>
where
    T: Clone
        + Send
        + Sync
        + PartialEq
        + Serialize
        + DeserializeOwned
        + std::fmt::Debug
        + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persisted")
            .field("key", &self.key)
            .field("value", &self.state.get_untracked())
            .finish()
    }
}
