//! Memos
//!
//! A [`Memo`] caches the result of a computation over other reactive values.
//!
//! - Construction runs nothing. The first read computes and caches.
//! - Reads while clean return the cache.
//! - An upstream change marks the memo "maybe dirty" and the mark travels on
//!   to whatever read the memo, so effects downstream of it get scheduled.
//! - The next read after that recomputes and collects a fresh set of inputs.
//!
//! # Failure
//!
//! If the computation panics, the panic reaches the reader, the previous
//! cached value is kept, and the memo stays dirty so the next read retries.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::context::ReactiveContext;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::subscriber::{SourceId, SubscriberId};

/// Dirty state for a memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The cached value is up-to-date.
    Clean,

    /// A dependency might have changed.
    MaybeDirty,

    /// The memo definitely needs to recompute.
    Dirty,
}

struct MemoInner<T> {
    /// Identity other computations depend on.
    source: SourceId,

    /// Identity used while this memo reads its own inputs.
    subscriber_id: SubscriberId,

    compute: Box<dyn Fn() -> T + Send + Sync>,

    /// The cached value (None if never computed).
    value: RwLock<Option<T>>,

    state: Mutex<MemoState>,
}

impl<T> MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn invalidate(&self, to: MemoState) {
        let was_clean = {
            let mut state = self.state.lock();
            let was_clean = *state == MemoState::Clean;
            if was_clean || to == MemoState::Dirty {
                *state = to;
            }
            was_clean
        };

        // A memo that was already dirty has told its dependents once.
        if was_clean {
            Runtime::notify_source_change(self.source);
        }
    }
}

impl<T> Reactive for MemoInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_maybe_dirty(&self) {
        self.invalidate(MemoState::MaybeDirty);
    }

    fn schedule(&self) {}

    fn is_eager(&self) -> bool {
        false
    }
}

/// Puts the memo back to dirty if the computation unwinds.
struct RecomputeGuard<'a> {
    state: &'a Mutex<MemoState>,
    finished: bool,
}

impl Drop for RecomputeGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.state.lock() = MemoState::Dirty;
        }
    }
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. Must be Clone + Send + Sync.
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    inner: Arc<MemoInner<T>>,

    /// Keeps the memo registered for as long as any clone is alive.
    handle: Arc<ReactiveHandle>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(MemoInner {
            source: SourceId::new(),
            subscriber_id: SubscriberId::new(),
            compute: Box::new(compute),
            value: RwLock::new(None),
            state: Mutex::new(MemoState::Dirty),
        });
        let handle = Arc::new(Runtime::register(inner.clone()));

        Self { inner, handle }
    }

    /// Get the memo's source ID.
    pub fn id(&self) -> SourceId {
        self.inner.source
    }

    /// Get the subscriber ID for this memo.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.handle.subscriber_id()
    }

    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        Runtime::track(self.inner.source);
        self.get_untracked()
    }

    /// Get the current value without registering the caller as a dependent.
    pub fn get_untracked(&self) -> T {
        if self.state() == MemoState::Clean {
            if let Some(value) = self.inner.value.read().as_ref() {
                return value.clone();
            }
        }

        self.recompute()
    }

    /// Mark the memo as potentially needing recomputation.
    pub fn mark_maybe_dirty(&self) {
        self.inner.invalidate(MemoState::MaybeDirty);
    }

    /// Mark the memo as definitely needing recomputation.
    pub fn mark_dirty(&self) {
        self.inner.invalidate(MemoState::Dirty);
    }

    /// Recompute the memo's value.
    ///
    /// Runs the computation within a reactive context to collect a fresh
    /// dependency set.
    fn recompute(&self) -> T {
        let inner = &self.inner;

        // Clean before running: an input that changes mid-computation marks
        // the memo dirty again instead of being overwritten afterwards.
        *inner.state.lock() = MemoState::Clean;
        let mut guard = RecomputeGuard {
            state: &inner.state,
            finished: false,
        };

        Runtime::clear_dependencies(inner.subscriber_id);
        let new_value = {
            let _ctx = ReactiveContext::enter(inner.subscriber_id);
            (inner.compute)()
        };
        guard.finished = true;

        *inner.value.write() = Some(new_value.clone());
        new_value
    }

    /// Get the current dirty state.
    pub fn state(&self) -> MemoState {
        *self.inner.state.lock()
    }

    /// Get the number of dependents.
    pub fn dependent_count(&self) -> usize {
        Runtime::subscriber_count(self.inner.source)
    }

    /// Get the number of sources read on the last computation.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.subscriber_id)
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.read().is_some()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            handle: Arc::clone(&self.handle),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.source)
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
