//! Interception pipeline.
//!
//! [`Intercepted`] wraps a signal with an ordered list of stages, each a
//! function `(proposed, previous) -> resolved`. A write is folded through
//! the stages left to right: every stage gets the previous stage's output as
//! `proposed`, and every stage gets the same `previous`, the value the signal
//! held before the write began. The final result goes through the signal's
//! ordinary equality-gated `set`.
//!
//! A stage rejects a write by returning `previous`. The fold does not stop
//! there, so a later stage can still replace the rejected value. Stage order
//! is the caller's policy and is applied as given.
//!
//! [`Traced`] is a decorator for any [`ReactiveCell`] that logs reads and
//! writes through `tracing` before delegating.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::reactive::{ReactiveCell, ReadSignal, Signal};

/// One pipeline stage: `(proposed, previous) -> resolved`.
pub type Interceptor<T> = Arc<dyn Fn(T, &T) -> T + Send + Sync>;

/// Build a stage that keeps `previous` whenever `accept(proposed)` is false.
pub fn validator<T, F>(accept: F) -> Interceptor<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(move |proposed: T, previous: &T| {
        if accept(&proposed) {
            proposed
        } else {
            tracing::debug!("write rejected by validator");
            previous.clone()
        }
    })
}

/// Build a stage that records every write into `log` and passes it through.
///
/// What it records as `proposed` is whatever the stages before it produced.
pub fn logger<T>(log: &ChangeLog<T>) -> Interceptor<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    let log = log.clone();
    Arc::new(move |proposed: T, previous: &T| {
        tracing::debug!(?previous, ?proposed, "write intercepted");
        log.push(ChangeRecord {
            previous: previous.clone(),
            proposed: proposed.clone(),
            at: SystemTime::now(),
        });
        proposed
    })
}

/// A write observed by a [`logger`] stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord<T> {
    /// Value held by the cell when the write was proposed.
    pub previous: T,
    /// Value as it reached the log stage, after any earlier stage.
    pub proposed: T,
    /// Wall-clock time the record was taken.
    pub at: SystemTime,
}

/// Shared, append-only list of [`ChangeRecord`]s.
///
/// Clones share the same list.
pub struct ChangeLog<T> {
    records: Arc<Mutex<Vec<ChangeRecord<T>>>>,
}

impl<T: Clone> ChangeLog<T> {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn push(&self, record: ChangeRecord<T>) {
        self.records.lock().push(record);
    }

    /// A copy of all records, oldest first.
    pub fn records(&self) -> Vec<ChangeRecord<T>> {
        self.records.lock().clone()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drop all records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

impl<T: Clone> Default for ChangeLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ChangeLog<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

/// A signal whose writes pass through an ordered list of stages.
///
/// # Example
///
/// ```rust,ignore
/// let log = ChangeLog::new();
/// let age = Intercepted::new(Signal::new(30))
///     .validate(|age| *age >= 0)
///     .stage(|age, _| age.min(150))
///     .log(&log);
///
/// age.set(-4);    // rejected, stays 30
/// age.set(200);   // clamped to 150
/// ```
pub struct Intercepted<T>
where
    T: Clone + Send + Sync + 'static,
{
    base: Signal<T>,
    stages: Vec<Interceptor<T>>,
}

impl<T> Intercepted<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap `base` with an empty pipeline.
    pub fn new(base: Signal<T>) -> Self {
        Self {
            base,
            stages: Vec::new(),
        }
    }

    /// Append a prebuilt stage.
    pub fn with_stage(mut self, stage: Interceptor<T>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a transform stage.
    pub fn stage<F>(self, f: F) -> Self
    where
        F: Fn(T, &T) -> T + Send + Sync + 'static,
    {
        self.with_stage(Arc::new(f))
    }

    /// Append a [`validator`] stage.
    pub fn validate<F>(self, accept: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.with_stage(validator(accept))
    }

    /// Append a [`logger`] stage writing to `log`.
    pub fn log(self, log: &ChangeLog<T>) -> Self
    where
        T: Debug,
    {
        self.with_stage(logger(log))
    }

    /// Fold `proposed` through the stages without committing it.
    pub fn resolve(&self, proposed: T) -> T {
        let previous = self.base.get_untracked();
        self.fold(proposed, &previous)
    }

    fn fold(&self, proposed: T, previous: &T) -> T {
        self.stages
            .iter()
            .fold(proposed, |value, stage| stage(value, previous))
    }

    /// Run `value` through the pipeline and commit the result.
    pub fn set(&self, value: T) {
        let previous = self.base.get_untracked();
        let resolved = self.fold(value, &previous);
        self.base.set(resolved);
    }

    /// Propose `f(current)` through the pipeline.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let previous = self.base.get_untracked();
        let resolved = self.fold(f(&previous), &previous);
        self.base.set(resolved);
    }

    /// The current value (tracked).
    pub fn get(&self) -> T {
        self.base.get()
    }

    /// The current value (untracked).
    pub fn get_untracked(&self) -> T {
        self.base.get_untracked()
    }

    /// Read-only view of the wrapped signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        self.base.read_only()
    }

    /// Number of stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl<T> ReactiveCell<T> for Intercepted<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Intercepted::get(self)
    }

    fn get_untracked(&self) -> T {
        Intercepted::get_untracked(self)
    }

    fn set(&self, value: T) {
        Intercepted::set(self, value)
    }
}

/// Logs every read and write of the wrapped cell, then delegates.
///
/// Reads log at `trace`, writes at `debug`, both tagged with `name`.
pub struct Traced<T, C> {
    name: String,
    inner: C,
    _value: PhantomData<fn() -> T>,
}

impl<T, C> Traced<T, C>
where
    T: Debug,
    C: ReactiveCell<T>,
{
    /// Wrap `inner`, tagging its log lines with `name`.
    pub fn new(name: impl Into<String>, inner: C) -> Self {
        Self {
            name: name.into(),
            inner,
            _value: PhantomData,
        }
    }

    /// The wrapped cell.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The tag used in log lines.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T, C> ReactiveCell<T> for Traced<T, C>
where
    T: Debug,
    C: ReactiveCell<T>,
{
    fn get(&self) -> T {
        let value = self.inner.get();
        tracing::trace!(cell = %self.name, ?value, "read");
        value
    }

    fn get_untracked(&self) -> T {
        self.inner.get_untracked()
    }

    fn set(&self, value: T) {
        let previous = self.inner.get_untracked();
        tracing::debug!(cell = %self.name, ?previous, next = ?value, "write");
        self.inner.set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn validator_rejects_negative_numbers() {
        let cell = Intercepted::new(Signal::new(5)).validate(|n: &i32| *n >= 0);

        cell.set(-1);
        assert_eq!(cell.get(), 5);

        cell.set(10);
        assert_eq!(cell.get(), 10);
    }

    #[test]
    fn stages_fold_left_to_right_with_original_previous() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = |tag: &'static str| {
            let seen = seen.clone();
            move |proposed: i32, previous: &i32| {
                seen.lock().push((tag, proposed, *previous));
                proposed * 2
            }
        };

        let cell = Intercepted::new(Signal::new(1))
            .stage(record("first"))
            .stage(record("second"));

        cell.set(3);

        assert_eq!(cell.get(), 12);
        assert_eq!(*seen.lock(), vec![("first", 3, 1), ("second", 6, 1)]);
    }

    #[test]
    fn later_stage_can_override_a_rejection() {
        let cell = Intercepted::new(Signal::new(5))
            .validate(|n: &i32| *n >= 0)
            .stage(|_, _| 42);

        cell.set(-1);
        assert_eq!(cell.get(), 42);
    }

    #[test]
    fn logger_records_what_reaches_it() {
        let log = ChangeLog::new();
        let cell = Intercepted::new(Signal::new(0))
            .stage(|n: i32, _| n.clamp(0, 100))
            .log(&log);

        cell.set(250);
        cell.update(|n| n - 30);

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!((records[0].previous, records[0].proposed), (0, 100));
        assert_eq!((records[1].previous, records[1].proposed), (100, 70));
        assert!(records[0].at <= records[1].at);
        assert_eq!(cell.get(), 70);
    }

    #[test]
    fn resolve_does_not_commit() {
        let cell = Intercepted::new(Signal::new(1)).stage(|n: i32, prev| n + prev);

        assert_eq!(cell.resolve(10), 11);
        assert_eq!(cell.get(), 1);
        assert_eq!(cell.stage_count(), 1);
    }

    #[test]
    fn rejected_write_does_not_notify() {
        let cell = Intercepted::new(Signal::new(5)).validate(|n: &i32| *n >= 0);
        let runs = Arc::new(AtomicUsize::new(0));

        let _observer = Effect::new({
            let view = cell.read_only();
            let runs = runs.clone();
            move || {
                view.get();
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });

        cell.set(-3);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        cell.set(6);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn traced_decorator_keeps_the_cell_surface() {
        let base = Signal::new("a".to_string());
        let traced: Traced<String, _> = Traced::new("title", base.clone());

        traced.set("b".to_string());
        assert_eq!(base.get(), "b");
        assert_eq!(ReactiveCell::get(&traced), "b");

        traced.update(&|s: &String| format!("{s}!"));
        assert_eq!(traced.get_untracked(), "b!");
        assert_eq!(traced.name(), "title");
    }

    #[test]
    fn traced_stacks_over_a_pipeline() {
        let pipeline = Intercepted::new(Signal::new(1)).validate(|n: &i32| *n % 2 == 1);
        let traced: Traced<i32, _> = Traced::new("odd", pipeline);

        traced.set(4);
        assert_eq!(traced.get_untracked(), 1);

        traced.set(7);
        assert_eq!(traced.inner().get(), 7);
    }
}
