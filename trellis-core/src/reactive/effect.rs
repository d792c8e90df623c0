//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is queued and re-runs once the
//!    current batch settles.
//!
//! 3. Before re-running, the effect clears its old dependencies and tracks
//!    new ones during execution.
//!
//! # Teardown
//!
//! The body receives a [`Teardown`] slot. The closure registered there runs
//! right before the next execution and when the effect is disposed, which is
//! where timers are cancelled and subscriptions released. Dropping the last
//! handle to an effect disposes it.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::subscriber::SubscriberId;

/// How many times an effect may re-trigger itself from inside its own body
/// before the loop is cut.
const MAX_SELF_RERUNS: usize = 100;

type Cleanup = Box<dyn FnOnce() + Send>;

/// Holds the cleanup closure for the current run of an effect.
#[derive(Default)]
pub struct Teardown {
    slot: Mutex<Option<Cleanup>>,
}

impl Teardown {
    /// Register the closure to run before the next run and on disposal.
    ///
    /// Registering again within the same run replaces the earlier closure.
    pub fn register<F>(&self, cleanup: F)
    where
        F: FnOnce() + Send + 'static,
    {
        *self.slot.lock() = Some(Box::new(cleanup));
    }

    /// Run and clear the registered closure, if any.
    fn run(&self) {
        let cleanup = self.slot.lock().take();
        if let Some(cleanup) = cleanup {
            cleanup();
        }
    }
}

struct EffectInner {
    subscriber_id: SubscriberId,
    run: Box<dyn Fn(&Teardown) + Send + Sync>,
    teardown: Teardown,
    disposed: AtomicBool,
    running: AtomicBool,
    rerun_requested: AtomicBool,
    run_count: AtomicUsize,
}

/// Clears the running flag even if the body unwinds.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        if self.running.swap(true, Ordering::SeqCst) {
            // Triggered from inside its own body; pick it up after this run.
            self.rerun_requested.store(true, Ordering::SeqCst);
            return;
        }
        let _running = RunningGuard(&self.running);

        let mut reruns = 0;
        loop {
            self.teardown.run();

            Runtime::clear_dependencies(self.subscriber_id);
            {
                let _ctx = ReactiveContext::enter(self.subscriber_id);
                (self.run)(&self.teardown);
            }
            self.run_count.fetch_add(1, Ordering::SeqCst);

            if !self.rerun_requested.swap(false, Ordering::SeqCst)
                || self.disposed.load(Ordering::SeqCst)
            {
                break;
            }

            reruns += 1;
            if reruns >= MAX_SELF_RERUNS {
                tracing::warn!(
                    subscriber = ?self.subscriber_id,
                    "effect keeps re-triggering itself, giving up after {MAX_SELF_RERUNS} re-runs"
                );
                break;
            }
        }
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.teardown.run();
        Runtime::clear_dependencies(self.subscriber_id);
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn mark_maybe_dirty(&self) {}

    fn schedule(&self) {
        self.execute();
    }

    fn is_eager(&self) -> bool {
        true
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.teardown.run();
        }
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let effect = Effect::new({
///     let count = count.clone();
///     move || println!("Count is: {}", count.get())
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,

    /// Keeps the effect registered for as long as any clone is alive.
    handle: Arc<ReactiveHandle>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_teardown(move |_| run())
    }

    /// Create an effect whose body can register a teardown closure.
    ///
    /// ```rust,ignore
    /// let effect = Effect::with_teardown(move |teardown| {
    ///     let handle = spawn_timer(value.get());
    ///     teardown.register(move || handle.abort());
    /// });
    /// ```
    pub fn with_teardown<F>(run: F) -> Self
    where
        F: Fn(&Teardown) + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.execute();
        effect
    }

    /// Create a new effect without running it.
    ///
    /// It has no dependencies until [`Effect::execute`] is called.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn(&Teardown) + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner {
            subscriber_id: SubscriberId::new(),
            run: Box::new(run),
            teardown: Teardown::default(),
            disposed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            rerun_requested: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });
        let handle = Arc::new(Runtime::register(inner.clone()));

        Self { inner, handle }
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.handle.subscriber_id()
    }

    /// Execute the effect function now.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Re-run the effect, deferring to the end of the batch if one is open.
    pub fn schedule(&self) {
        if Runtime::is_batching() {
            Runtime::defer(self.inner.clone());
        } else {
            self.inner.execute();
        }
    }

    /// Dispose of the effect.
    ///
    /// Runs the pending teardown and stops all future runs. Calling it again
    /// does nothing.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of dependencies.
    pub fn dependency_count(&self) -> usize {
        Runtime::dependency_count(self.inner.subscriber_id)
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            handle: Arc::clone(&self.handle),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("subscriber_id", &self.inner.subscriber_id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
