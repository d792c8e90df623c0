//! Previous-value derivation.
//!
//! A memo whose computation sees both the source's current value and the
//! value it had at the memo's prior recomputation. Exactly one step back is
//! remembered; use [`History`](super::History) for more.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::reactive::{Memo, Signal};

/// Derive a memo from `source` and its previous value.
///
/// `f` receives the current value and `None` on the first computation,
/// `Some(previous)` afterwards. The remembered value is replaced only after
/// `f` returns, so a panic in `f` leaves it untouched and the retried read
/// sees the same inputs.
///
/// ```rust,ignore
/// let price = Signal::new(100);
/// let trend = with_previous(&price, |now, before| match before {
///     Some(before) if now > before => "up",
///     Some(before) if now < before => "down",
///     _ => "flat",
/// });
/// ```
pub fn with_previous<T, R, F>(source: &Signal<T>, f: F) -> Memo<R>
where
    T: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    F: Fn(&T, Option<&T>) -> R + Send + Sync + 'static,
{
    let source = source.clone();
    let remembered: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));

    Memo::new(move || {
        let current = source.get();
        let previous = remembered.lock().clone();
        let result = f(&current, previous.as_ref());
        *remembered.lock() = Some(current);
        result
    })
}

/// Fallible form of [`with_previous`].
///
/// The remembered value advances only when `f` returns `Ok`. An `Err` is
/// cached like any other result until the source changes again.
pub fn try_with_previous<T, R, E, F>(source: &Signal<T>, f: F) -> Memo<Result<R, E>>
where
    T: Clone + Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: Fn(&T, Option<&T>) -> Result<R, E> + Send + Sync + 'static,
{
    let source = source.clone();
    let remembered: Arc<Mutex<Option<T>>> = Arc::new(Mutex::new(None));

    Memo::new(move || {
        let current = source.get();
        let previous = remembered.lock().clone();
        let result = f(&current, previous.as_ref());
        if result.is_ok() {
            *remembered.lock() = Some(current);
        }
        result
    })
}
