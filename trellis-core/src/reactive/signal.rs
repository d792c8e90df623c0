//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    runtime records the reader as a subscriber.
//!
//! 2. When a signal's value changes, all subscribers are notified.
//!
//! 3. A write is compared against the current value with the signal's
//!    equality function first. Equal writes are dropped without notifying.
//!
//! # Thread Safety
//!
//! Signals are `Send + Sync`. The value sits behind a read-write lock that is
//! never held while user code runs, so closures passed to [`Signal::update`]
//! and [`Signal::modify`] may freely read other signals (or this one).
//!
//! Writers also take a per-signal reentrant writer lock for the whole
//! read-compute-commit step, so concurrent `update` calls from different
//! threads never lose each other's changes. The writer lock is released before
//! subscribers are notified. A closure that writes a second signal while
//! another thread does the reverse can deadlock; keep cross-signal writes in
//! `update` closures on one thread.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, RwLock};

use super::memo::Memo;
use super::runtime::Runtime;
use super::subscriber::SourceId;

type EqualityFn<T> = dyn Fn(&T, &T) -> bool + Send + Sync;

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let value = count.get();
///
/// // Notifies subscribers
/// count.set(5);
///
/// // Equal to the current value: no notification
/// count.set(5);
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Unique identifier for this signal.
    id: SourceId,

    /// The current value.
    value: Arc<RwLock<T>>,

    /// Serializes writers across their read-compute-commit step.
    writer: Arc<ReentrantMutex<()>>,

    /// Decides whether a write is a change.
    equals: Arc<EqualityFn<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new signal compared with `PartialEq`.
    pub fn new(value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_equality(value, |a: &T, b: &T| a == b)
    }

    /// Create a new signal with a custom equality function.
    ///
    /// Pass `|_, _| false` to treat every write as a change.
    pub fn with_equality<F>(value: T, equals: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            id: SourceId::new(),
            value: Arc::new(RwLock::new(value)),
            writer: Arc::new(ReentrantMutex::new(())),
            equals: Arc::new(equals),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T {
        Runtime::track(self.id);
        self.value.read().clone()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value and notify subscribers if it differs.
    pub fn set(&self, value: T) {
        let changed = {
            let _writer = self.writer.lock();
            self.commit(value)
        };
        if changed {
            Runtime::notify_source_change(self.id);
        }
    }

    /// Update the value using a function of the current value.
    ///
    /// Read, compute and commit happen under the writer lock, so no other
    /// thread's write can land in between.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let changed = {
            let _writer = self.writer.lock();
            let next = f(&self.get_untracked());
            self.commit(next)
        };
        if changed {
            Runtime::notify_source_change(self.id);
        }
    }

    fn commit(&self, value: T) -> bool {
        let mut guard = self.value.write();
        if (self.equals)(&guard, &value) {
            tracing::trace!(signal = %self.id, "write skipped, value unchanged");
            return false;
        }
        *guard = value;
        true
    }

    /// Mutate a copy of the value in place.
    ///
    /// `f` reports whether it changed anything. The copy is committed and
    /// subscribers notified only when it returns `true`; the equality function
    /// is not consulted.
    pub fn modify<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        {
            let _writer = self.writer.lock();
            let mut next = self.get_untracked();
            if !f(&mut next) {
                return false;
            }
            *self.value.write() = next;
        }

        Runtime::notify_source_change(self.id);
        true
    }

    /// Get a read-only view of this signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
        }
    }

    /// Derive a memo that maps this signal through `f`.
    ///
    /// Use this instead of two signals kept in sync by effects: the derived
    /// side can never drift from its source.
    pub fn derive<R, F>(&self, f: F) -> Memo<R>
    where
        R: Clone + Send + Sync + 'static,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        let source = self.clone();
        Memo::new(move || f(&source.get()))
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        Runtime::subscriber_count(self.id)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
            writer: Arc::clone(&self.writer),
            equals: Arc::clone(&self.equals),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// A read-only view of a [`Signal`].
///
/// Handed out by primitives that own a signal and must be its only writer.
pub struct ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    signal: Signal<T>,
}

impl<T> ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Get the current value, tracking the read.
    pub fn get(&self) -> T {
        self.signal.get()
    }

    /// Get the current value without tracking.
    pub fn get_untracked(&self) -> T {
        self.signal.get_untracked()
    }

    /// ID of the underlying signal.
    pub fn id(&self) -> SourceId {
        self.signal.id()
    }
}

impl<T> Clone for ReadSignal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T> Debug for ReadSignal<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.signal).finish()
    }
}

/// A readable and writable reactive cell.
///
/// Implemented by [`Signal`] and by wrappers that keep its surface while
/// changing what a write does, so they can be stacked.
pub trait ReactiveCell<T>: Send + Sync {
    /// Read the value, tracking the read.
    fn get(&self) -> T;

    /// Read the value without tracking.
    fn get_untracked(&self) -> T;

    /// Write a value.
    fn set(&self, value: T);

    /// Write a value computed from the current one.
    fn update(&self, f: &dyn Fn(&T) -> T) {
        let current = self.get_untracked();
        self.set(f(&current));
    }
}

impl<T> ReactiveCell<T> for Signal<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Signal::get(self)
    }

    fn get_untracked(&self) -> T {
        Signal::get_untracked(self)
    }

    fn set(&self, value: T) {
        Signal::set(self, value)
    }

    fn update(&self, f: &dyn Fn(&T) -> T) {
        Signal::update(self, f)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn equal_write_does_not_notify() {
        let signal = Signal::new(1);
        let runs = Arc::new(AtomicI32::new(0));

        let _effect = Effect::new({
            let signal = signal.clone();
            let runs = runs.clone();
            move || {
                signal.get();
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        signal.set(1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        signal.set(2);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn custom_equality_always_notifies() {
        let signal = Signal::with_equality(vec![1], |_, _| false);
        let runs = Arc::new(AtomicI32::new(0));

        let _effect = Effect::new({
            let signal = signal.clone();
            let runs = runs.clone();
            move || {
                signal.get();
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });

        signal.set(vec![1]);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn modify_commits_only_reported_changes() {
        let signal = Signal::new(vec![1, 2]);

        assert!(!signal.modify(|items| {
            items.push(3);
            false
        }));
        assert_eq!(signal.get(), vec![1, 2]);

        assert!(signal.modify(|items| {
            items.push(3);
            true
        }));
        assert_eq!(signal.get(), vec![1, 2, 3]);
    }

    #[test]
    fn update_closure_may_read_the_signal() {
        let signal = Signal::new(3);
        let reader = signal.clone();
        signal.update(|v| v + reader.get_untracked());
        assert_eq!(signal.get(), 6);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let signal = Signal::new(0_u32);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let signal = signal.clone();
                scope.spawn(move || {
                    for _ in 0..1000 {
                        signal.update(|n| n + 1);
                    }
                });
            }
        });

        assert_eq!(signal.get_untracked(), 8000);
    }

    #[test]
    fn concurrent_modifies_are_not_lost() {
        let signal = Signal::new(Vec::new());

        std::thread::scope(|scope| {
            for t in 0..4_u32 {
                let signal = signal.clone();
                scope.spawn(move || {
                    for i in 0..250 {
                        signal.modify(|items| {
                            items.push(t * 1000 + i);
                            true
                        });
                    }
                });
            }
        });

        assert_eq!(signal.get_untracked().len(), 1000);
    }

    #[test]
    fn update_closure_may_write_the_same_signal() {
        let signal = Signal::new(1);
        let inner = signal.clone();
        signal.update(|v| {
            inner.set(10);
            v + 1
        });
        assert_eq!(signal.get(), 2);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
    }

    #[test]
    fn read_only_view_follows_writes() {
        let signal = Signal::new("a".to_string());
        let view = signal.read_only();

        signal.set("b".to_string());
        assert_eq!(view.get(), "b");
        assert_eq!(view.id(), signal.id());
    }

    #[test]
    fn derived_memo_tracks_source() {
        let celsius = Signal::new(100.0_f64);
        let fahrenheit = celsius.derive(|c| c * 9.0 / 5.0 + 32.0);

        assert_eq!(fahrenheit.get(), 212.0);
        celsius.set(0.0);
        assert_eq!(fahrenheit.get(), 32.0);
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);
        let s3 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
    }
}
