//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It manages the dependency graph and schedules updates when
//! signals change.
//!
//! # How It Works
//!
//! 1. When a memo or effect is created, it registers with the runtime.
//!
//! 2. When a memo or effect reads a source, the runtime records the edge.
//!
//! 3. When a source changes, the runtime:
//!    a. Finds all dependent memos/effects
//!    b. Marks them as "maybe dirty" (memos forward this to their own dependents)
//!    c. Queues effects for execution
//!    d. Memos are lazy - they recompute on next access
//!
//! 4. Queued effects run once the outermost batch closes. Every notification
//!    opens an implicit batch, so marking always finishes before any effect
//!    observes the graph.
//!
//! # Thread Safety
//!
//! Dependency tables are global concurrent maps. The batch depth and the
//! pending effect queue are thread-local: a batch only coalesces writes made
//! on the thread that opened it.

use std::cell::{Cell, RefCell};
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::{SourceId, SubscriberId};

/// A trait for types that can be notified when dependencies change.
pub trait Reactive: Send + Sync {
    /// Get the subscriber ID for this reactive value.
    fn subscriber_id(&self) -> SubscriberId;

    /// Mark this reactive value as potentially needing update.
    fn mark_maybe_dirty(&self);

    /// Execute this reactive value (effects only).
    fn schedule(&self);

    /// Check if this reactive value is an effect (eager) or memo (lazy).
    fn is_eager(&self) -> bool;
}

/// Handle to a registered reactive value.
///
/// Dropping this handle unregisters the reactive value from the runtime.
pub struct ReactiveHandle {
    subscriber_id: SubscriberId,
}

impl ReactiveHandle {
    /// The subscriber this handle keeps registered.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }
}

impl Drop for ReactiveHandle {
    fn drop(&mut self) {
        Runtime::unregister(self.subscriber_id);
    }
}

/// The global reactive runtime.
pub struct Runtime;

type Subscribers = SmallVec<[SubscriberId; 4]>;
type Sources = SmallVec<[SourceId; 4]>;

// Weak references so the registry never keeps a computation alive.
static REGISTRY: OnceLock<DashMap<SubscriberId, Weak<dyn Reactive>>> = OnceLock::new();
// source -> subscribers that read it
static SOURCE_SUBSCRIBERS: OnceLock<DashMap<SourceId, Subscribers>> = OnceLock::new();
// subscriber -> sources it read on its last run
static SUBSCRIBER_SOURCES: OnceLock<DashMap<SubscriberId, Sources>> = OnceLock::new();

fn get_registry() -> &'static DashMap<SubscriberId, Weak<dyn Reactive>> {
    REGISTRY.get_or_init(DashMap::new)
}

fn get_source_subscribers() -> &'static DashMap<SourceId, Subscribers> {
    SOURCE_SUBSCRIBERS.get_or_init(DashMap::new)
}

fn get_subscriber_sources() -> &'static DashMap<SubscriberId, Sources> {
    SUBSCRIBER_SOURCES.get_or_init(DashMap::new)
}

thread_local! {
    static BATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
    static FLUSHING: Cell<bool> = const { Cell::new(false) };
    static PENDING: RefCell<Vec<Arc<dyn Reactive>>> = const { RefCell::new(Vec::new()) };
}

/// Upper bound on queue drains per flush before the cycle is cut.
const MAX_FLUSH_PASSES: usize = 1000;

/// Clears the flushing flag even if an effect unwinds.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        FLUSHING.with(|flushing| flushing.set(false));
        if std::thread::panicking() {
            PENDING.with(|pending| pending.borrow_mut().clear());
        }
    }
}

/// Closes a batch level when dropped, flushing at the outermost level.
struct BatchGuard;

impl BatchGuard {
    fn open() -> Self {
        BATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
        BatchGuard
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let depth = BATCH_DEPTH.with(|depth| {
            let next = depth.get().saturating_sub(1);
            depth.set(next);
            next
        });

        if depth > 0 {
            return;
        }

        if std::thread::panicking() {
            // Effects must not run against a half-written batch.
            PENDING.with(|pending| pending.borrow_mut().clear());
            return;
        }

        Runtime::flush();
    }
}

impl Runtime {
    /// Register a reactive value with the runtime.
    ///
    /// Returns a handle that unregisters the value when dropped.
    pub fn register(reactive: Arc<dyn Reactive>) -> ReactiveHandle {
        let id = reactive.subscriber_id();
        get_registry().insert(id, Arc::downgrade(&reactive));
        ReactiveHandle { subscriber_id: id }
    }

    fn unregister(id: SubscriberId) {
        get_registry().remove(&id);
        Self::clear_dependencies(id);
    }

    /// Record that a subscriber depends on a source.
    ///
    /// Called automatically when a source is read within a reactive context.
    pub fn add_dependency(source: SourceId, subscriber_id: SubscriberId) {
        {
            let mut subscribers = get_source_subscribers().entry(source).or_default();
            if !subscribers.contains(&subscriber_id) {
                subscribers.push(subscriber_id);
            }
        }

        let mut sources = get_subscriber_sources().entry(subscriber_id).or_default();
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    /// Record a read of `source` by whatever computation is currently tracked.
    pub fn track(source: SourceId) {
        if let Some(subscriber_id) = ReactiveContext::current_subscriber() {
            Self::add_dependency(source, subscriber_id);
        }
    }

    /// Remove all dependencies for a subscriber.
    ///
    /// Called before re-running a computation to clear stale dependencies.
    pub fn clear_dependencies(subscriber_id: SubscriberId) {
        let Some((_, sources)) = get_subscriber_sources().remove(&subscriber_id) else {
            return;
        };

        let table = get_source_subscribers();
        for source in sources {
            let now_empty = match table.get_mut(&source) {
                Some(mut subscribers) => {
                    subscribers.retain(|s| *s != subscriber_id);
                    subscribers.is_empty()
                }
                None => false,
            };
            if now_empty {
                table.remove_if(&source, |_, subscribers| subscribers.is_empty());
            }
        }
    }

    /// Number of subscribers currently depending on `source`.
    pub fn subscriber_count(source: SourceId) -> usize {
        get_source_subscribers()
            .get(&source)
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Number of sources `subscriber_id` read on its last run.
    pub fn dependency_count(subscriber_id: SubscriberId) -> usize {
        get_subscriber_sources()
            .get(&subscriber_id)
            .map(|sources| sources.len())
            .unwrap_or(0)
    }

    /// Notify all subscribers that a source changed.
    ///
    /// This is the core update propagation mechanism.
    pub fn notify_source_change(source: SourceId) {
        let subscriber_ids = get_source_subscribers()
            .get(&source)
            .map(|subscribers| subscribers.value().clone())
            .unwrap_or_default();

        if subscriber_ids.is_empty() {
            return;
        }

        tracing::trace!(%source, subscribers = subscriber_ids.len(), "source changed");

        let _batch = BatchGuard::open();

        for sub_id in subscriber_ids {
            let weak = get_registry().get(&sub_id).map(|entry| entry.value().clone());
            let Some(reactive) = weak.and_then(|weak| weak.upgrade()) else {
                continue;
            };

            reactive.mark_maybe_dirty();

            if reactive.is_eager() {
                Self::enqueue(reactive);
            }
        }
    }

    /// Queue an effect to run when the current batch closes.
    pub(crate) fn defer(reactive: Arc<dyn Reactive>) {
        Self::enqueue(reactive);
    }

    fn enqueue(reactive: Arc<dyn Reactive>) {
        PENDING.with(|pending| {
            let mut pending = pending.borrow_mut();
            let id = reactive.subscriber_id();
            if !pending.iter().any(|queued| queued.subscriber_id() == id) {
                pending.push(reactive);
            }
        });
    }

    fn flush() {
        if FLUSHING.with(|flushing| flushing.replace(true)) {
            // An outer flush is already draining the queue.
            return;
        }
        let _flushing = FlushGuard;

        for _ in 0..MAX_FLUSH_PASSES {
            let ready = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
            if ready.is_empty() {
                return;
            }
            for effect in ready {
                effect.schedule();
            }
        }

        let dropped = PENDING.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
        tracing::warn!(
            passes = MAX_FLUSH_PASSES,
            dropped = dropped.len(),
            "effects kept re-triggering each other, flush cut short"
        );
    }

    /// Run `f` with effect execution deferred until it returns.
    ///
    /// Writes inside the batch mark dependents immediately, but each affected
    /// effect runs once, after `f` completes, against the settled state.
    /// Batches nest; only the outermost one flushes.
    pub fn batch<R>(f: impl FnOnce() -> R) -> R {
        let _batch = BatchGuard::open();
        f()
    }

    /// Check if a batch is currently open on this thread.
    pub fn is_batching() -> bool {
        BATCH_DEPTH.with(|depth| depth.get() > 0)
    }

    /// Get the current subscriber being tracked, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        ReactiveContext::current_subscriber()
    }

    /// Check if we're inside a reactive context.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

/// Shorthand for [`Runtime::batch`].
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    Runtime::batch(f)
}
