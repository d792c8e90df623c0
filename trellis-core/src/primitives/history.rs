//! Bounded undo/redo history.
//!
//! A linear log of values with a cursor. States are the indices
//! `0..len`; `undo` and `redo` move the cursor by one and stop at the ends.
//! `write` is the only operation that changes the log itself:
//!
//! 1. Drop every entry after the cursor (the redo branch is lost).
//! 2. Append the new value.
//! 3. If the log is now over capacity, evict the oldest entry and leave the
//!    cursor where it is; otherwise advance the cursor.
//!
//! Once the log is full every write silently costs one step of undo depth.
//!
//! Mutations from different threads are serialized, so concurrent writes
//! each land as their own entry.

use parking_lot::Mutex;

use crate::config::HistoryConfig;
use crate::reactive::{batch, Memo, ReadSignal, Signal};

/// An undo/redo log over a value.
///
/// # Example
///
/// ```rust,ignore
/// let doc = History::new("A");
/// doc.write("B");
/// doc.write("C");
/// doc.undo();
/// assert_eq!(doc.current(), "B");
/// doc.write("D");
/// assert!(!doc.can_redo());
/// assert_eq!(doc.entries().get(), vec!["A", "B", "D"]);
/// ```
pub struct History<T>
where
    T: Clone + Send + Sync + 'static,
{
    entries: Signal<Vec<T>>,
    index: Signal<usize>,
    capacity: usize,
    // Held while a mutation reads the cursor and commits; released before
    // the batch flushes.
    cursor: Mutex<()>,
    current: Memo<T>,
    can_undo: Memo<bool>,
    can_redo: Memo<bool>,
}

impl<T> History<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a log holding only `initial`, with the default capacity.
    pub fn new(initial: T) -> Self {
        Self::with_config(initial, &HistoryConfig::default())
    }

    /// Create a log using the capacity from `config`.
    pub fn with_config(initial: T, config: &HistoryConfig) -> Self {
        Self::with_capacity(initial, config.capacity)
    }

    /// Create a log retaining at most `capacity` entries.
    ///
    /// A capacity of zero is treated as one: the current value always exists.
    pub fn with_capacity(initial: T, capacity: usize) -> Self {
        let capacity = capacity.max(1);

        // Every committed mutation is a real change; skip the O(n) compare.
        let entries = Signal::with_equality(vec![initial], |_, _| false);
        let index = Signal::new(0_usize);

        let current = Memo::new({
            let (entries, index) = (entries.clone(), index.clone());
            move || {
                let entries = entries.get();
                let at = index.get().min(entries.len().saturating_sub(1));
                entries[at].clone()
            }
        });

        let can_undo = index.derive(|index| *index > 0);

        let can_redo = Memo::new({
            let (entries, index) = (entries.clone(), index.clone());
            move || index.get() + 1 < entries.get().len()
        });

        Self {
            entries,
            index,
            capacity,
            cursor: Mutex::new(()),
            current,
            can_undo,
            can_redo,
        }
    }

    /// The value at the cursor.
    pub fn current(&self) -> T {
        self.current.get()
    }

    /// Memo of the value at the cursor, for handing to other computations.
    pub fn current_memo(&self) -> Memo<T> {
        self.current.clone()
    }

    /// Record `value` as the new current state.
    pub fn write(&self, value: T) {
        let capacity = self.capacity;
        let mut evicted = false;

        batch(|| {
            let _cursor = self.cursor.lock();
            let at = self.index.get_untracked();
            self.entries.modify(|entries| {
                entries.truncate(at + 1);
                entries.push(value);
                if entries.len() > capacity {
                    entries.remove(0);
                    evicted = true;
                }
                true
            });

            if !evicted {
                self.index.set(at + 1);
            }
        });

        if evicted {
            tracing::debug!(capacity, "history full, oldest entry evicted");
        }
    }

    /// Step back one entry. Does nothing at the oldest entry.
    pub fn undo(&self) {
        batch(|| {
            let _cursor = self.cursor.lock();
            let at = self.index.get_untracked();
            if at > 0 {
                self.index.set(at - 1);
            }
        });
    }

    /// Step forward one entry. Does nothing at the newest entry.
    pub fn redo(&self) {
        batch(|| {
            let _cursor = self.cursor.lock();
            let at = self.index.get_untracked();
            if at + 1 < self.len() {
                self.index.set(at + 1);
            }
        });
    }

    /// Whether [`undo`](Self::undo) would move the cursor.
    pub fn can_undo(&self) -> bool {
        self.can_undo.get()
    }

    /// Whether [`redo`](Self::redo) would move the cursor.
    pub fn can_redo(&self) -> bool {
        self.can_redo.get()
    }

    /// Forget all other entries, keeping the current value as the only one.
    pub fn clear(&self) {
        batch(|| {
            let _cursor = self.cursor.lock();
            let current = self.current.get_untracked();
            self.entries.set(vec![current]);
            self.index.set(0);
        });
    }

    /// Read-only view of the full log, oldest first.
    pub fn entries(&self) -> ReadSignal<Vec<T>> {
        self.entries.read_only()
    }

    /// The cursor position (tracked).
    pub fn index(&self) -> usize {
        self.index.get()
    }

    /// Number of retained entries (untracked).
    pub fn len(&self) -> usize {
        self.entries.get_untracked().len()
    }

    /// Always false: the log holds at least the current value.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Maximum number of retained entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> std::fmt::Debug for History<T>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("History")
            .field("entries", &self.entries.get_untracked())
            .field("index", &self.index.get_untracked())
            .field("capacity", &self.capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn starts_with_initial_value_only() {
        let history = History::new(1);

        assert_eq!(history.current(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.capacity(), 50);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn concurrent_writes_each_become_an_entry() {
        let history = History::with_capacity(0_u32, 1000);

        std::thread::scope(|scope| {
            for t in 0..4_u32 {
                let history = &history;
                scope.spawn(move || {
                    for i in 1..=100 {
                        history.write(t * 1000 + i);
                    }
                });
            }
        });

        assert_eq!(history.len(), 401);
        assert_eq!(history.index(), 400);
        assert!(!history.can_redo());
    }

    #[test]
    fn branch_truncation_scenario() {
        let history = History::new("A");
        history.write("B");
        history.write("C");

        history.undo();
        assert_eq!(history.current(), "B");
        assert!(history.can_redo());

        history.write("D");
        assert_eq!(history.current(), "D");
        assert!(!history.can_redo());
        assert_eq!(history.entries().get(), vec!["A", "B", "D"]);
    }

    #[test]
    fn undo_and_redo_stop_at_the_ends() {
        let history = History::new(0);
        history.write(1);

        history.undo();
        history.undo();
        assert_eq!(history.current(), 0);
        assert_eq!(history.index(), 0);

        history.redo();
        history.redo();
        assert_eq!(history.current(), 1);
        assert_eq!(history.index(), 1);
    }

    #[test]
    fn length_and_round_trips_within_capacity() {
        let history = History::with_capacity(0, 10);
        for v in 1..=9 {
            history.write(v);
        }
        assert_eq!(history.len(), 10);

        for m in 0..=9 {
            for _ in 0..m {
                history.undo();
            }
            assert_eq!(history.current(), history.entries().get()[9 - m]);
            for _ in 0..m {
                history.redo();
            }
            assert_eq!(history.current(), 9);
        }
    }

    #[test]
    fn write_after_double_undo_drops_redo() {
        let history = History::new(0);
        history.write(1);
        history.write(2);
        history.undo();
        history.undo();

        history.write(7);
        assert!(!history.can_redo());
        assert_eq!(history.entries().get(), vec![0, 7]);
    }

    #[test]
    fn capacity_evicts_oldest_and_keeps_index() {
        let history = History::with_capacity('a', 3);
        history.write('b');
        history.write('c');
        assert_eq!(history.index(), 2);

        history.write('d');
        assert_eq!(history.entries().get(), vec!['b', 'c', 'd']);
        assert_eq!(history.index(), 2);
        assert_eq!(history.current(), 'd');

        history.undo();
        history.undo();
        history.undo();
        // 'a' is no longer reachable.
        assert_eq!(history.current(), 'b');
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let history = History::with_capacity(1, 0);
        history.write(2);

        assert_eq!(history.entries().get(), vec![2]);
        assert_eq!(history.current(), 2);
        assert!(!history.can_undo());
    }

    #[test]
    fn write_notifies_observers_once() {
        let history = History::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _observer = Effect::new({
            let current = history.current_memo();
            let seen = seen.clone();
            move || seen.lock().push(current.get())
        });

        history.write(5);
        history.undo();

        assert_eq!(*seen.lock(), vec![0, 5, 0]);
    }

    #[test]
    fn clear_keeps_only_current() {
        let history = History::new(1);
        history.write(2);
        history.write(3);
        history.undo();

        history.clear();
        assert_eq!(history.entries().get(), vec![2]);
        assert_eq!(history.index(), 0);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }
}
