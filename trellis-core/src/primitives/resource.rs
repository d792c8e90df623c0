//! Async resource loader.
//!
//! Wraps a zero-argument async producer in three signals: `data`, `loading`
//! and `error`. Nothing loads until [`Resource::refresh`] is called.
//!
//! # States
//!
//! ```text
//! Idle --refresh--> Loading --Ok--> Ready
//!                          \--Err-> Failed
//! ```
//!
//! `refresh` is accepted from any state, including `Loading`.
//!
//! # Overlapping refreshes
//!
//! The most recently started load wins. Each refresh takes a fresh
//! generation number; when a load completes it only commits if its number is
//! still the newest. An older load that finishes late is discarded and does
//! not touch `loading`, so the indicator stays on until the newest load
//! lands and never flickers off early.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::reactive::{batch, ReadSignal, Signal};

type Producer<T, E> = dyn Fn() -> BoxFuture<'static, std::result::Result<T, E>> + Send + Sync;

/// Where a resource is in its load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    /// Never loaded.
    Idle,
    /// A load is in flight.
    Loading,
    /// The last load produced data.
    Ready,
    /// The last load produced an error.
    Failed,
}

/// Snapshot of a resource's three signals.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T, E> {
    /// Value from the last successful load, cleared when a refresh starts.
    pub data: Option<T>,
    /// True while the newest refresh is in flight.
    pub loading: bool,
    /// Failure from the last load, cleared when a refresh starts.
    pub error: Option<E>,
}

struct ResourceInner<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    producer: Box<Producer<T, E>>,
    data: Signal<Option<T>>,
    loading: Signal<bool>,
    error: Signal<Option<E>>,
    generation: AtomicU64,
}

/// An async value with loading and error state.
///
/// Cloning is cheap and every clone drives the same state.
///
/// # Example
///
/// ```rust,ignore
/// let user = Resource::new(|| async { fetch_user().await });
///
/// user.refresh().await;
/// match user.status() {
///     ResourceStatus::Ready => render(user.data().get()),
///     ResourceStatus::Failed => show(user.error().get()),
///     _ => {}
/// }
/// ```
pub struct Resource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    inner: Arc<ResourceInner<T, E>>,
}

/// Turns `loading` back off if a current load is dropped before finishing.
struct LoadGuard<'a, T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    inner: &'a ResourceInner<T, E>,
    generation: u64,
    finished: bool,
}

impl<T, E> Drop for LoadGuard<'_, T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if !self.finished && self.inner.generation.load(Ordering::SeqCst) == self.generation {
            tracing::debug!(generation = self.generation, "resource load cancelled");
            self.inner.loading.set(false);
        }
    }
}

impl<T, E> Resource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an idle resource around `producer`.
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
    {
        // Every completion is a new result, even if it compares equal.
        let inner = ResourceInner {
            producer: Box::new(move || producer().boxed()),
            data: Signal::with_equality(None, |_, _| false),
            loading: Signal::new(false),
            error: Signal::with_equality(None, |_, _| false),
            generation: AtomicU64::new(0),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Run the producer and commit its outcome.
    ///
    /// Clears `data` and `error` and raises `loading` first. A producer error
    /// lands in [`error`](Self::error); it is never returned from here.
    pub async fn refresh(&self) {
        let inner = &*self.inner;
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // `data` and `error` never compare equal, so only clear what is set.
        batch(|| {
            if inner.data.get_untracked().is_some() {
                inner.data.set(None);
            }
            if inner.error.get_untracked().is_some() {
                inner.error.set(None);
            }
            inner.loading.set(true);
        });
        tracing::debug!(generation, "resource load started");

        let mut guard = LoadGuard {
            inner,
            generation,
            finished: false,
        };
        let outcome = (inner.producer)().await;
        guard.finished = true;

        if inner.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(generation, "stale resource load discarded");
            return;
        }

        batch(|| {
            match outcome {
                Ok(value) => {
                    tracing::debug!(generation, "resource load succeeded");
                    inner.data.set(Some(value));
                }
                Err(err) => {
                    tracing::debug!(generation, "resource load failed");
                    inner.error.set(Some(err));
                }
            }
            inner.loading.set(false);
        });
    }

    /// Start a refresh on the current tokio runtime without awaiting it.
    pub fn spawn_refresh(&self) -> Result<JoinHandle<()>> {
        let runtime = Handle::try_current()?;
        let this = self.clone();
        Ok(runtime.spawn(async move { this.refresh().await }))
    }

    /// Read-only view of the last successful value.
    pub fn data(&self) -> ReadSignal<Option<T>> {
        self.inner.data.read_only()
    }

    /// Read-only view of the in-flight flag.
    pub fn loading(&self) -> ReadSignal<bool> {
        self.inner.loading.read_only()
    }

    /// Read-only view of the last failure.
    pub fn error(&self) -> ReadSignal<Option<E>> {
        self.inner.error.read_only()
    }

    /// All three values at once (tracked).
    pub fn state(&self) -> ResourceState<T, E> {
        ResourceState {
            data: self.inner.data.get(),
            loading: self.inner.loading.get(),
            error: self.inner.error.get(),
        }
    }

    /// The current position in the load cycle (tracked).
    pub fn status(&self) -> ResourceStatus {
        if self.inner.loading.get() {
            ResourceStatus::Loading
        } else if self.inner.error.get().is_some() {
            ResourceStatus::Failed
        } else if self.inner.data.get().is_some() {
            ResourceStatus::Ready
        } else {
            ResourceStatus::Idle
        }
    }

    /// Number of refreshes started so far.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }
}

impl<T, E> Clone for Resource<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> std::fmt::Debug for Resource<T, E>
where
    T: Clone + Send + Sync + std::fmt::Debug + 'static,
    E: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("data", &self.inner.data.get_untracked())
            .field("loading", &self.inner.loading.get_untracked())
            .field("error", &self.inner.error.get_untracked())
            .field("generation", &self.generation())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::time::sleep;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// A producer whose n-th call (1-based) sleeps `delays[n - 1]` and
    /// returns `n`.
    fn staggered(delays: &'static [u64]) -> Resource<usize, String> {
        let calls = Arc::new(AtomicUsize::new(0));
        Resource::new(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = delays.get(n - 1).copied().unwrap_or(10);
            async move {
                sleep(ms(delay)).await;
                Ok(n)
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn starts_idle_without_loading() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resource: Resource<u32, String> = Resource::new({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(1) }
            }
        });

        sleep(ms(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(resource.status(), ResourceStatus::Idle);
        assert_eq!(
            resource.state(),
            ResourceState {
                data: None,
                loading: false,
                error: None
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_sets_data_and_clears_loading() {
        let resource = staggered(&[100]);

        let task = resource.spawn_refresh().unwrap();
        tokio::task::yield_now().await;
        assert_eq!(resource.status(), ResourceStatus::Loading);
        assert_eq!(resource.data().get(), None);

        task.await.unwrap();
        assert_eq!(resource.status(), ResourceStatus::Ready);
        assert_eq!(resource.data().get(), Some(1));
        assert_eq!(resource.error().get(), None);
        assert!(!resource.loading().get());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_captured_not_returned() {
        let resource: Resource<u32, String> = Resource::new(|| async {
            sleep(ms(20)).await;
            Err("offline".to_string())
        });

        resource.refresh().await;

        assert_eq!(resource.status(), ResourceStatus::Failed);
        assert_eq!(resource.error().get(), Some("offline".to_string()));
        assert_eq!(resource.data().get(), None);
        assert!(!resource.loading().get());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_after_failure_clears_error_while_loading() {
        let failing = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let resource: Resource<u32, String> = Resource::new({
            let failing = failing.clone();
            move || {
                let fail = failing.load(Ordering::SeqCst);
                async move {
                    sleep(ms(30)).await;
                    if fail {
                        Err("boom".to_string())
                    } else {
                        Ok(7)
                    }
                }
            }
        });

        resource.refresh().await;
        assert_eq!(resource.status(), ResourceStatus::Failed);

        failing.store(false, Ordering::SeqCst);
        let task = resource.spawn_refresh().unwrap();
        tokio::task::yield_now().await;
        assert_eq!(resource.error().get(), None);
        assert_eq!(resource.data().get(), None);

        task.await.unwrap();
        assert_eq!(resource.data().get(), Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn loading_toggles_once_per_refresh() {
        let resource = staggered(&[40, 40]);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _watch = Effect::new({
            let loading = resource.loading();
            let seen = seen.clone();
            move || seen.lock().push(loading.get())
        });

        resource.refresh().await;
        resource.refresh().await;

        assert_eq!(*seen.lock(), vec![false, true, false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_only_notifies_for_values_it_changes() {
        let resource = staggered(&[10, 10]);
        let data_seen = Arc::new(Mutex::new(Vec::new()));
        let error_runs = Arc::new(AtomicUsize::new(0));

        let _data = Effect::new({
            let data = resource.data();
            let data_seen = data_seen.clone();
            move || data_seen.lock().push(data.get())
        });
        let _error = Effect::new({
            let error = resource.error();
            let error_runs = error_runs.clone();
            move || {
                error.get();
                error_runs.fetch_add(1, Ordering::SeqCst);
            }
        });

        resource.refresh().await;
        assert_eq!(*data_seen.lock(), vec![None, Some(1)]);

        resource.refresh().await;
        assert_eq!(*data_seen.lock(), vec![None, Some(1), None, Some(2)]);
        assert_eq!(error_runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_older_load_cannot_overwrite_newer() {
        // First call takes 200ms, second 50ms.
        let resource = staggered(&[200, 50]);

        let first = resource.spawn_refresh().unwrap();
        tokio::task::yield_now().await;
        let second = resource.spawn_refresh().unwrap();
        tokio::task::yield_now().await;

        sleep(ms(100)).await;
        assert_eq!(resource.data().get(), Some(2));
        assert!(!resource.loading().get());

        first.await.unwrap();
        second.await.unwrap();
        assert_eq!(resource.data().get(), Some(2));
        assert!(!resource.loading().get());
        assert_eq!(resource.generation(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fast_older_load_keeps_loading_on() {
        // First call takes 50ms, second 200ms.
        let resource = staggered(&[50, 200]);

        let first = resource.spawn_refresh().unwrap();
        tokio::task::yield_now().await;
        let second = resource.spawn_refresh().unwrap();
        tokio::task::yield_now().await;

        sleep(ms(100)).await;
        first.await.unwrap();
        assert_eq!(resource.data().get(), None);
        assert!(resource.loading().get());

        second.await.unwrap();
        assert_eq!(resource.data().get(), Some(2));
        assert!(!resource.loading().get());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_load_lowers_loading() {
        let resource = staggered(&[500]);

        let outcome = tokio::time::timeout(ms(20), resource.refresh()).await;
        assert!(outcome.is_err());

        assert!(!resource.loading().get());
        assert_eq!(resource.status(), ResourceStatus::Idle);
    }

    #[test]
    fn spawn_refresh_requires_runtime() {
        let resource = staggered(&[1]);
        assert!(resource.spawn_refresh().is_err());
    }
}
