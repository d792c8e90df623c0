//! Debounced relay.
//!
//! Mirrors an input signal into an output signal once the input has been
//! left alone for a fixed delay. Every change to the input cancels the
//! pending propagation and starts a new one (trailing edge), so a steady
//! stream of writes faster than the delay postpones the output indefinitely.
//!
//! The timer is a tokio task owned by the relay's effect: the effect's
//! teardown aborts it, which covers both a superseding write (teardown runs
//! before the re-run) and disposal (teardown runs on dispose or drop).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::DebounceConfig;
use crate::error::Result;
use crate::reactive::{Effect, ReadSignal, Signal};

/// An input signal whose value reaches an output signal after a quiet period.
///
/// # Example
///
/// ```rust,ignore
/// let search = Debounced::new(String::new(), Duration::from_millis(250))?;
///
/// search.set("r".into());
/// search.set("ru".into());
/// search.set("rust".into());
///
/// // 250ms after the last keystroke, and only once:
/// let query = search.output();
/// ```
pub struct Debounced<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    input: Signal<T>,
    output: Signal<T>,
    delay: Duration,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
    relay: Effect,
}

impl<T> Debounced<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a relay with both sides set to `initial`.
    ///
    /// Must be called from within a tokio runtime; timers are spawned on it.
    pub fn new(initial: T, delay: Duration) -> Result<Self> {
        let runtime = Handle::try_current()?;

        let input = Signal::new(initial.clone());
        let output = Signal::new(initial);
        let pending: Arc<Mutex<Option<JoinHandle<()>>>> = Arc::new(Mutex::new(None));
        let primed = AtomicBool::new(false);

        let relay = Effect::with_teardown({
            let input = input.clone();
            let output = output.clone();
            let pending = pending.clone();
            move |teardown| {
                let value = input.get();

                // The first run only subscribes; both sides already agree.
                if !primed.swap(true, Ordering::SeqCst) {
                    return;
                }

                tracing::trace!(signal = %input.id(), ?delay, "debounce timer started");
                let output = output.clone();
                let task = runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    output.set(value);
                });

                let abort = task.abort_handle();
                *pending.lock() = Some(task);
                teardown.register(move || abort.abort());
            }
        });

        Ok(Self {
            input,
            output,
            delay,
            pending,
            relay,
        })
    }

    /// Create a relay using the delay from `config`.
    pub fn from_config(initial: T, config: &DebounceConfig) -> Result<Self> {
        Self::new(initial, config.delay())
    }

    /// Write the input. The output follows after the delay.
    pub fn set(&self, value: T) {
        self.input.set(value);
    }

    /// Update the input from its current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.input.update(f);
    }

    /// The writable input signal.
    pub fn input(&self) -> &Signal<T> {
        &self.input
    }

    /// The current input value (tracked).
    pub fn value(&self) -> T {
        self.input.get()
    }

    /// Read-only view of the output signal.
    pub fn output(&self) -> ReadSignal<T> {
        self.output.read_only()
    }

    /// The current output value (tracked).
    pub fn debounced(&self) -> T {
        self.output.get()
    }

    /// The configured quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Check if a propagation is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Cancel the pending timer and propagate the input right away.
    pub fn flush(&self) {
        if let Some(task) = self.pending.lock().take() {
            task.abort();
        }
        self.output.set(self.input.get_untracked());
    }

    /// Stop relaying. A pending propagation is cancelled, never fired.
    ///
    /// Dropping the relay has the same effect; calling this twice is harmless.
    pub fn dispose(&self) {
        self.relay.dispose();
    }
}

impl<T> std::fmt::Debug for Debounced<T>
where
    T: Clone + Send + Sync + PartialEq + std::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debounced")
            .field("input", &self.input.get_untracked())
            .field("output", &self.output.get_untracked())
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}
