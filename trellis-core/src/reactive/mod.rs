//! Reactive runtime
//!
//! Signals, memos, and effects, plus the bookkeeping that connects them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] holds a value. Reading it inside a memo or effect records a
//! dependency on it; writing a different value notifies everything that
//! depends on it. Writes that compare equal to the current value are dropped.
//!
//! ## Memos
//!
//! A [`Memo`] caches a computation over other reactive values. A change
//! upstream only marks it stale; it recomputes on the next read.
//!
//! ## Effects
//!
//! An [`Effect`] runs a side effect now and again whenever something it read
//! changes. Through [`Teardown`] it can leave cleanup behind for its next run
//! and for disposal.
//!
//! ## Batches
//!
//! Inside [`batch`] effects wait until the outermost batch ends, then each
//! runs once against the settled state. [`untrack`] reads without recording
//! dependencies.
//!
//! # Implementation Notes
//!
//! Dependencies are found through a thread-local stack of tracking frames.
//! The edges themselves live in global tables keyed by [`SourceId`] and
//! [`SubscriberId`], owned by [`Runtime`].

mod context;
mod effect;
mod memo;
mod runtime;
mod signal;
mod subscriber;

pub use context::{untrack, ReactiveContext};
pub use effect::{Effect, Teardown};
pub use memo::{Memo, MemoState};
pub use runtime::{batch, Reactive, ReactiveHandle, Runtime};
pub use signal::{ReactiveCell, ReadSignal, Signal};
pub use subscriber::{SourceId, SubscriberId};
