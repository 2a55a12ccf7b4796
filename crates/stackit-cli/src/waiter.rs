//! Polls an asynchronous operation until it reaches a terminal state.
//!
//! Intervals grow exponentially from `min_interval` to `max_interval`, each
//! sleep carries ±10% jitter, and every sleep races the cancellation token
//! and the overall deadline.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use stackit_sdk::SdkError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{CliError, Result};

const JITTER: f64 = 0.1;

/// Polling schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOptions {
    /// Delay before the first poll.
    pub initial_delay: Duration,
    /// Interval after the first poll.
    pub min_interval: Duration,
    /// Upper bound on the interval.
    pub max_interval: Duration,
    /// Interval growth factor.
    pub backoff_factor: f64,
    /// Overall time budget, measured from the start of the wait.
    pub deadline: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            backoff_factor: 2.0,
            deadline: Duration::from_secs(20 * 60),
        }
    }
}

impl WaitOptions {
    /// Sets the delay before the first poll.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the interval bounds.
    #[must_use]
    pub const fn with_intervals(mut self, min: Duration, max: Duration) -> Self {
        self.min_interval = min;
        self.max_interval = max;
        self
    }

    /// Sets the overall time budget.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Interval to sleep after the given poll, before jitter.
    #[must_use]
    pub fn interval_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_factor.max(1.0).powi(exponent);
        let millis = self.min_interval.as_millis() as f64 * factor;
        let capped = millis.min(self.max_interval.as_millis() as f64);
        Duration::from_millis(capped as u64).max(self.min_interval.min(self.max_interval))
    }
}

fn jittered(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range((1.0 - JITTER)..=(1.0 + JITTER));
    delay.mul_f64(factor)
}

/// Why a poll failed.
#[derive(Debug)]
pub enum FetchError {
    /// Retried on the next tick.
    Transient(SdkError),
    /// Ends the wait with `REMOTE`.
    Fatal(SdkError),
}

impl From<SdkError> for FetchError {
    fn from(err: SdkError) -> Self {
        if err.is_transient() {
            Self::Transient(err)
        } else {
            Self::Fatal(err)
        }
    }
}

/// Classification of a polled state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// Keep polling; the label is reported as the last observed state.
    Pending(String),
    /// Done.
    Success,
    /// Failed with a reason reported by the service.
    Failure(String),
}

impl Terminal {
    /// A pending state with the given label.
    #[must_use]
    pub fn pending(label: impl Into<String>) -> Self {
        Self::Pending(label.into())
    }
}

/// Progress callbacks, typically a spinner.
pub trait WaitHooks: Send + Sync {
    /// The wait starts.
    fn on_start(&self, message: &str);
    /// A poll observed a pending state.
    fn on_tick(&self, state: &str);
    /// The wait ended, successfully or not.
    fn on_stop(&self);
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl WaitHooks for NoHooks {
    fn on_start(&self, _: &str) {}
    fn on_tick(&self, _: &str) {}
    fn on_stop(&self) {}
}

/// What is being waited for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitTarget {
    /// Resource identifier used in timeout errors, e.g. `KMS key 1234`.
    pub resource: String,
    /// Operation verb used in failure errors, e.g. `wait for KMS key creation`.
    pub operation: String,
    /// Spinner message, e.g. `Creating key`.
    pub message: String,
}

impl WaitTarget {
    /// Creates a target.
    #[must_use]
    pub fn new(resource: impl Into<String>, operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Polls `fetch` until `check` reports a terminal state.
///
/// # Errors
///
/// - [`CliError::WaitTimeout`] on cancellation or when the deadline passes
/// - [`CliError::OperationFailed`] when `check` reports a failure
/// - [`CliError::Remote`] when `fetch` fails fatally
pub async fn wait<S, F, Fut, C>(
    cancel: &CancellationToken,
    target: &WaitTarget,
    mut fetch: F,
    check: C,
    options: &WaitOptions,
    hooks: &dyn WaitHooks,
) -> Result<S>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<S, FetchError>>,
    C: Fn(&S) -> Terminal,
{
    let deadline = Instant::now() + options.deadline;
    let mut last_state = String::from("unknown");
    let mut attempt: u32 = 0;
    let mut delay = options.initial_delay;

    let timeout = |last_state: &str, cancelled: bool| CliError::WaitTimeout {
        resource: target.resource.clone(),
        last_state: last_state.to_owned(),
        cancelled,
    };

    hooks.on_start(&target.message);
    let outcome = loop {
        if !delay.is_zero() {
            tokio::select! {
                () = cancel.cancelled() => break Err(timeout(&last_state, true)),
                () = tokio::time::sleep_until(deadline) => break Err(timeout(&last_state, false)),
                () = tokio::time::sleep(jittered(delay)) => {}
            }
        }
        if cancel.is_cancelled() {
            break Err(timeout(&last_state, true));
        }
        if Instant::now() >= deadline {
            break Err(timeout(&last_state, false));
        }

        attempt = attempt.saturating_add(1);
        let fetched = tokio::select! {
            () = cancel.cancelled() => break Err(timeout(&last_state, true)),
            fetched = fetch() => fetched,
        };

        match fetched {
            Ok(state) => match check(&state) {
                Terminal::Success => {
                    debug!(resource = %target.resource, attempt, "wait finished");
                    break Ok(state);
                }
                Terminal::Failure(reason) => {
                    break Err(CliError::OperationFailed {
                        operation: target.operation.clone(),
                        reason,
                    });
                }
                Terminal::Pending(label) => {
                    trace!(resource = %target.resource, attempt, state = %label, "still pending");
                    hooks.on_tick(&label);
                    last_state = label;
                }
            },
            Err(FetchError::Transient(e)) => {
                debug!(resource = %target.resource, attempt, error = %e, "transient error while polling");
            }
            Err(FetchError::Fatal(e)) => break Err(CliError::remote(&target.operation, e)),
        }

        delay = options.interval_after(attempt);
    };
    hooks.on_stop();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl WaitHooks for Recorder {
        fn on_start(&self, message: &str) {
            self.events.lock().push(format!("start:{message}"));
        }
        fn on_tick(&self, state: &str) {
            self.events.lock().push(format!("tick:{state}"));
        }
        fn on_stop(&self) {
            self.events.lock().push("stop".to_owned());
        }
    }

    fn target() -> WaitTarget {
        WaitTarget::new("key k1", "wait for KMS key creation", "Creating key")
    }

    fn check(state: &&'static str) -> Terminal {
        match *state {
            "active" => Terminal::Success,
            "failed" => Terminal::Failure("backend error".into()),
            other => Terminal::pending(other),
        }
    }

    #[test]
    fn intervals_grow_and_cap() {
        let options = WaitOptions::default().with_intervals(Duration::from_secs(1), Duration::from_secs(10));
        assert_eq!(options.interval_after(1), Duration::from_secs(1));
        assert_eq!(options.interval_after(2), Duration::from_secs(2));
        assert_eq!(options.interval_after(3), Duration::from_secs(4));
        assert_eq!(options.interval_after(4), Duration::from_secs(8));
        assert_eq!(options.interval_after(5), Duration::from_secs(10));
        assert_eq!(options.interval_after(500), Duration::from_secs(10));
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        for _ in 0..100 {
            let d = jittered(Duration::from_secs(10));
            assert!(d >= Duration::from_secs(9) && d <= Duration::from_secs(11), "{d:?}");
        }
    }

    #[test]
    fn transient_classification() {
        assert!(matches!(FetchError::from(SdkError::http(503, b"")), FetchError::Transient(_)));
        assert!(matches!(FetchError::from(SdkError::http(404, b"")), FetchError::Fatal(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_state_on_success() {
        let states = Arc::new(Mutex::new(vec!["creating", "creating", "active"].into_iter()));
        let hooks = Recorder::default();
        let state = wait(
            &CancellationToken::new(),
            &target(),
            || {
                let states = Arc::clone(&states);
                async move { Ok(states.lock().next().unwrap_or("active")) }
            },
            check,
            &WaitOptions::default(),
            &hooks,
        )
        .await
        .expect("success");
        assert_eq!(state, "active");
        assert_eq!(
            *hooks.events.lock(),
            vec!["start:Creating key", "tick:creating", "tick:creating", "stop"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_reports_last_state() {
        let polls = AtomicU32::new(0);
        let options = WaitOptions::default()
            .with_intervals(Duration::from_secs(1), Duration::from_secs(4))
            .with_deadline(Duration::from_secs(30));
        let err = wait(
            &CancellationToken::new(),
            &target(),
            || {
                polls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, FetchError>("creating") }
            },
            check,
            &options,
            &NoHooks,
        )
        .await
        .expect_err("timeout");
        assert_eq!(err.kind(), ErrorKind::WaitTimeout);
        assert!(matches!(
            &err,
            CliError::WaitTimeout { last_state, cancelled: false, .. } if last_state == "creating"
        ));
        let polls = polls.load(Ordering::SeqCst);
        assert!((5..=12).contains(&polls), "polled {polls} times");
    }

    #[tokio::test(start_paused = true)]
    async fn failure_state_is_remote() {
        let err = wait(
            &CancellationToken::new(),
            &target(),
            || async { Ok::<_, FetchError>("failed") },
            check,
            &WaitOptions::default(),
            &NoHooks,
        )
        .await
        .expect_err("failure");
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(err.to_string(), "wait for KMS key creation: backend error");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_and_fatal_errors_stop() {
        let polls = Arc::new(AtomicU32::new(0));
        let state = wait(
            &CancellationToken::new(),
            &target(),
            || {
                let n = polls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(FetchError::from(SdkError::transport("connection reset")))
                    } else {
                        Ok("active")
                    }
                }
            },
            check,
            &WaitOptions::default(),
            &NoHooks,
        )
        .await
        .expect("recovered");
        assert_eq!(state, "active");
        assert_eq!(polls.load(Ordering::SeqCst), 3);

        let err = wait(
            &CancellationToken::new(),
            &target(),
            || async { Err::<&str, _>(FetchError::from(SdkError::http(403, b"{\"message\":\"forbidden\"}"))) },
            check,
            &WaitOptions::default(),
            &NoHooks,
        )
        .await
        .expect_err("fatal");
        assert_eq!(err.to_string(), "wait for KMS key creation: HTTP 403: forbidden");
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_sleep() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });
        let hooks = Recorder::default();
        let err = wait(
            &cancel,
            &target(),
            || async { Ok::<_, FetchError>("creating") },
            check,
            &WaitOptions::default(),
            &hooks,
        )
        .await
        .expect_err("cancelled");
        assert!(matches!(err, CliError::WaitTimeout { cancelled: true, .. }));
        assert_eq!(hooks.events.lock().last().map(String::as_str), Some("stop"));
    }
}
