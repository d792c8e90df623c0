//! Identifier types for the reactive graph.
//!
//! Every node in the graph has one or two identities:
//!
//! - A [`SourceId`] if other computations can depend on it (signals, memos).
//! - A [`SubscriberId`] if it depends on other nodes (memos, effects).
//!
//! A memo has both: it reads signals as a subscriber and is read by effects
//! as a source.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Each subscriber (memo or effect) gets a unique ID when created. This ID is
/// used to track dependencies and avoid duplicate subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for something that can be depended on.
///
/// Signals and memos draw from the same counter, so a dependency list can mix
/// both without collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw counter value, mostly useful in log output.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "src#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_ids_are_unique() {
        let id1 = SubscriberId::new();
        let id2 = SubscriberId::new();
        let id3 = SubscriberId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn source_ids_are_unique_and_ordered() {
        let a = SourceId::new();
        let b = SourceId::new();

        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(format!("{a}"), format!("src#{}", a.as_u64()));
    }
}
