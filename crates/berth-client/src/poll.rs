//! Retry an operation until a condition holds or a deadline passes.
//!
//! The decision for each attempt is a pure function of the probe outcome,
//! the elapsed time and the current delay ([`PollPolicy::decide`]).
//! [`loop_until`] drives it with `tokio::time`, so paused-clock tests can
//! step through a whole wait without real sleeping.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{ClientError, Result};

/// The outcome of one attempt.
#[derive(Debug)]
pub enum Probe<T> {
    /// The condition holds; stop with this value.
    Ready(T),
    /// Not there yet. The text describes what was observed.
    Pending(String),
    /// A failure that retrying cannot fix.
    Failed(ClientError),
}

/// What the poll loop should do next.
#[derive(Debug)]
pub enum Verdict<T> {
    /// Stop and return the value.
    Succeed(T),
    /// Sleep for `delay`, then probe again.
    Retry {
        /// How long to wait.
        delay: Duration,
        /// What the last probe saw.
        observed: String,
    },
    /// Stop with this error.
    Abort(ClientError),
    /// The deadline passed without the condition holding.
    Expired {
        /// What the last probe saw.
        observed: String,
    },
}

/// Shortest delay between attempts.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Delay schedule between attempts.
///
/// The delay starts at `initial_interval`, grows by `multiplier` after each
/// attempt, and never exceeds `max_interval` or the time left before the
/// deadline. Intervals are never shorter than [`MIN_INTERVAL`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    initial_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(1),
            multiplier: 1.5,
        }
    }
}

impl PollPolicy {
    /// A constant delay between attempts, at least [`MIN_INTERVAL`].
    #[must_use]
    pub fn fixed(interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
        }
    }

    /// Replace the first and maximum delay. `initial` is raised to
    /// [`MIN_INTERVAL`] and `max` to `initial` if they are smaller.
    #[must_use]
    pub fn with_intervals(mut self, initial: Duration, max: Duration) -> Self {
        let initial = initial.max(MIN_INTERVAL);
        self.initial_interval = initial;
        self.max_interval = max.max(initial);
        self
    }

    /// Replace the growth factor. Values below 1.0 are treated as 1.0.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            1.0
        };
        self
    }

    /// First delay.
    #[must_use]
    pub const fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    /// Largest delay.
    #[must_use]
    pub const fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// The delay that follows `current`.
    #[must_use]
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_interval)
    }

    /// Decide what to do with a probe outcome.
    ///
    /// `delay` is the delay scheduled for this attempt. A pending outcome at
    /// or past the deadline expires; otherwise the retry delay is clamped to
    /// the time remaining.
    pub fn decide<T>(
        &self,
        probe: Probe<T>,
        elapsed: Duration,
        timeout: Duration,
        delay: Duration,
    ) -> Verdict<T> {
        match probe {
            Probe::Ready(value) => Verdict::Succeed(value),
            Probe::Failed(err) => Verdict::Abort(err),
            Probe::Pending(observed) => match timeout.checked_sub(elapsed) {
                Some(remaining) if !remaining.is_zero() => Verdict::Retry {
                    delay: delay.min(remaining),
                    observed,
                },
                _ => Verdict::Expired { observed },
            },
        }
    }
}

/// Run `probe` until it is ready, fails, or `timeout` elapses.
///
/// Each probe call is bounded by the time remaining, so a probe that hangs
/// cannot stretch the wait past the deadline. The first attempt happens
/// immediately.
///
/// # Errors
///
/// Returns the error from a [`Probe::Failed`] outcome, or
/// `ClientError::Timeout` carrying the last observation.
pub async fn loop_until<T, F, Fut>(
    policy: &PollPolicy,
    timeout: Duration,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    let started = Instant::now();
    let mut delay = policy.initial_interval;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let remaining = timeout.saturating_sub(started.elapsed());
        let outcome = tokio::time::timeout(remaining, probe())
            .await
            .unwrap_or_else(|_| Probe::Pending("no answer before the deadline".to_string()));

        match policy.decide(outcome, started.elapsed(), timeout, delay) {
            Verdict::Succeed(value) => {
                debug!(attempt, elapsed = ?started.elapsed(), "Condition met");
                return Ok(value);
            }
            Verdict::Abort(err) => {
                debug!(attempt, error = %err, "Giving up on non-retriable error");
                return Err(err);
            }
            Verdict::Expired { observed } => {
                debug!(attempt, observed = %observed, "Deadline passed");
                return Err(ClientError::Timeout {
                    waited: started.elapsed(),
                    last_observed: observed,
                });
            }
            Verdict::Retry {
                delay: sleep_for,
                observed,
            } => {
                trace!(attempt, observed = %observed, delay = ?sleep_for, "Not ready, retrying");
                tokio::time::sleep(sleep_for).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}
