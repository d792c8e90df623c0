//! Tracking frames
//!
//! Each thread keeps a stack of frames, one per computation currently
//! evaluating. A read of any source is recorded in the runtime against the
//! subscriber of the frame on top, which is how memos and effects learn what
//! they depend on without declaring it.
//!
//! [`ReactiveContext`] pushes a frame and pops it on drop, so the stack stays
//! balanced through early returns and unwinding. A frame with no subscriber
//! is untracked: reads made while it is on top are invisible to the
//! computation underneath.

use std::cell::RefCell;

use super::subscriber::SubscriberId;

thread_local! {
    // `None` marks an untracked frame.
    static CONTEXT_STACK: RefCell<Vec<Option<SubscriberId>>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
///
/// This keeps the context stack balanced even if the computation panics.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a tracked frame for `subscriber_id`.
    ///
    /// Sources read while it is on top are recorded against the subscriber
    /// in the runtime's dependency tables.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        Self::push(Some(subscriber_id))
    }

    /// Enter an untracked frame.
    ///
    /// Reads inside the frame are not attributed to any subscriber.
    pub fn untracked() -> Self {
        Self::push(None)
    }

    fn push(subscriber_id: Option<SubscriberId>) -> Self {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(subscriber_id));
        Self { subscriber_id }
    }

    /// Check if reads are currently being tracked.
    pub fn is_active() -> bool {
        Self::current_subscriber().is_some()
    }

    /// The subscriber of the frame on top of the stack, if it is tracked.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().copied().flatten())
    }

    /// Number of frames on this thread's stack.
    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            debug_assert_eq!(
                popped,
                Some(self.subscriber_id),
                "tracking frames popped out of order"
            );
        });
    }
}

/// Run `f` without tracking any of the reads it performs.
///
/// ```rust,ignore
/// let effect = Effect::new(move || {
///     // Re-runs when `a` changes, but not when `b` does.
///     let sum = a.get() + untrack(|| b.get());
/// });
/// ```
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}
