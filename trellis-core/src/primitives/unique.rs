//! Unique keyed collection.
//!
//! An insertion-ordered list where no two items share a key. The key is
//! extracted from each item by a caller-supplied function, defaulting to the
//! item's `to_string()`.

use std::fmt::Display;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::reactive::{Memo, Signal};

type KeyFn<T> = dyn Fn(&T) -> String + Send + Sync;

/// An ordered, duplicate-free collection.
///
/// Mutations that change nothing (adding a present key, removing an absent
/// one) do not notify.
///
/// # Example
///
/// ```rust,ignore
/// let selected = UniqueList::with_key(|row: &Row| row.id.clone());
/// selected.toggle(row.clone());
/// assert!(selected.has(&row));
/// selected.toggle(row.clone());
/// assert!(!selected.has(&row));
/// ```
pub struct UniqueList<T>
where
    T: Clone + Send + Sync + 'static,
{
    items: Signal<IndexMap<String, T>>,
    key: Arc<KeyFn<T>>,
    size: Memo<usize>,
}

impl<T> UniqueList<T>
where
    T: Clone + Send + Sync + Display + 'static,
{
    /// Create an empty list keyed by each item's `to_string()`.
    pub fn new() -> Self {
        Self::with_key(|item: &T| item.to_string())
    }
}

impl<T> Default for UniqueList<T>
where
    T: Clone + Send + Sync + Display + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> UniqueList<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty list with a custom key extractor.
    pub fn with_key<F>(key: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        // Only real changes are committed, see `modify` below.
        let items = Signal::with_equality(IndexMap::new(), |_, _| false);
        let size = items.derive(|items| items.len());

        Self {
            items,
            key: Arc::new(key),
            size,
        }
    }

    /// The items in insertion order (tracked).
    pub fn items(&self) -> Vec<T> {
        self.items.get().into_values().collect()
    }

    /// Number of items (tracked).
    pub fn size(&self) -> usize {
        self.size.get()
    }

    /// Number of items (untracked).
    pub fn len(&self) -> usize {
        self.items.get_untracked().len()
    }

    /// Check if the list is empty (untracked).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if an item with the same key is present (tracked).
    pub fn has(&self, item: &T) -> bool {
        let key = (self.key)(item);
        self.items.get().contains_key(&key)
    }

    /// Append `item` unless its key is already present.
    ///
    /// Returns whether it was added. The first occurrence keeps its slot.
    pub fn add(&self, item: T) -> bool {
        let key = (self.key)(&item);
        self.items.modify(|items| {
            if items.contains_key(&key) {
                return false;
            }
            items.insert(key, item);
            true
        })
    }

    /// Add every item in order, skipping keys already present.
    pub fn extend<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let incoming: Vec<(String, T)> = items
            .into_iter()
            .map(|item| ((self.key)(&item), item))
            .collect();

        self.items.modify(|items| {
            let before = items.len();
            for (key, item) in incoming {
                items.entry(key).or_insert(item);
            }
            items.len() != before
        });
    }

    /// Remove the item sharing `item`'s key. Returns whether one was removed.
    pub fn remove(&self, item: &T) -> bool {
        let key = (self.key)(item);
        self.items
            .modify(|items| items.shift_remove(&key).is_some())
    }

    /// Remove `item` if present, add it otherwise, in a single change.
    ///
    /// Returns whether the item is present afterwards.
    pub fn toggle(&self, item: T) -> bool {
        let key = (self.key)(&item);
        let mut present = false;
        self.items.modify(|items| {
            if items.shift_remove(&key).is_none() {
                items.insert(key, item);
                present = true;
            }
            true
        });
        present
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.items.set(IndexMap::new());
    }
}

impl<T> std::fmt::Debug for UniqueList<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.items.get_untracked().values())
            .finish()
    }
}
