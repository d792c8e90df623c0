//! Trellis Core
//!
//! Fine-grained reactive state for Rust applications.
//!
//! - Reactive runtime (signals, memos, effects, batches)
//! - State primitives layered on top of it: previous-value memos, debouncing,
//!   undo/redo history, persisted values, async resources, unique lists, and
//!   write interception
//!
//! # Architecture
//!
//! - `reactive`: the runtime and dependency tracking
//! - `primitives`: the higher-level state helpers
//! - `store`: the key-value backend used by persisted values
//! - `config`: tunables loadable from JSON
//! - `error`: the crate error type
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::primitives::History;
//! use trellis_core::reactive::{Effect, Signal};
//!
//! let count = Signal::new(0);
//! let doubled = count.derive(|n| n * 2);
//!
//! let _log = Effect::new(move || println!("doubled: {}", doubled.get()));
//! count.set(5); // prints "doubled: 10"
//!
//! let doc = History::new(String::from("draft"));
//! doc.write(String::from("final"));
//! doc.undo();
//! assert_eq!(doc.current(), "draft");
//! ```

pub mod config;
pub mod error;
pub mod primitives;
pub mod reactive;
pub mod store;

pub use error::{Result, TrellisError};
