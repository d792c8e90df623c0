//! State primitives built on the reactive runtime.
//!
//! Each primitive owns a handful of signals, memos, and effects and exposes
//! them through a narrow API:
//!
//! - [`with_previous`]: a memo that also sees the value from its last run
//! - [`Debounced`]: an output that follows its input after a quiet period
//! - [`History`]: a bounded undo/redo log
//! - [`Persisted`]: a value mirrored into a [`KeyValueStore`](crate::store::KeyValueStore)
//! - [`Resource`]: the latest result of an async producer
//! - [`UniqueList`]: an ordered collection without duplicate keys
//! - [`Intercepted`]: a signal whose writes run through a pipeline of stages

mod debounce;
mod history;
mod intercept;
mod persisted;
mod previous;
mod resource;
mod unique;

pub use debounce::Debounced;
pub use history::History;
pub use intercept::{logger, validator, ChangeLog, ChangeRecord, Intercepted, Interceptor, Traced};
pub use persisted::Persisted;
pub use previous::{try_with_previous, with_previous};
pub use resource::{Resource, ResourceState, ResourceStatus};
pub use unique::UniqueList;
