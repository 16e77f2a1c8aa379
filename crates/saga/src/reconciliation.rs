//! Bounded polling for read-side convergence.
//!
//! Commands and projections are not transactionally linked. Code that needs
//! to observe the effect of an appended event on a view polls the view with
//! [`RetryWithExponentialBackoff::wait_or_throw`] instead of assuming the
//! view is up to date.

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use thiserror::Error;
use tokio::time::Instant;

/// Errors from the convergence waiter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error("Timed out after {elapsed:?} waiting for {description}")]
    ConvergenceTimeout {
        description: String,
        elapsed: Duration,
    },
}

/// Polls a predicate on an exponential schedule until it holds or the total
/// wait reaches `max_wait`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryWithExponentialBackoff {
    initial_interval: Duration,
    multiplier: f32,
    max_wait: Duration,
}

impl RetryWithExponentialBackoff {
    pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(200);
    pub const DEFAULT_MULTIPLIER: f32 = 2.0;

    /// Multipliers below 1.0 are raised to 1.0 (constant interval). A zero
    /// interval or a non-finite multiplier would poll in a tight loop or
    /// overflow the schedule, so those fall back to the defaults.
    pub fn new(initial_interval: Duration, multiplier: f32, max_wait: Duration) -> Self {
        let initial_interval = if initial_interval.is_zero() {
            Self::DEFAULT_INITIAL_INTERVAL
        } else {
            initial_interval
        };
        let multiplier = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            Self::DEFAULT_MULTIPLIER
        };

        Self {
            initial_interval,
            multiplier,
            max_wait,
        }
    }

    /// 200 ms, doubling, for at most one minute.
    pub fn one_minute_waiter() -> Self {
        Self::new(
            Self::DEFAULT_INITIAL_INTERVAL,
            Self::DEFAULT_MULTIPLIER,
            Duration::from_secs(60),
        )
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    fn schedule(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_interval)
            .with_factor(self.multiplier)
            .with_max_delay(self.max_wait)
            .without_max_times()
    }

    /// Evaluates `condition` until it returns true.
    ///
    /// The first evaluation is immediate. Sleeps never extend past
    /// `max_wait`, and the predicate is evaluated once more when the window
    /// closes before giving up, so a timeout reports an elapsed time of at
    /// least `max_wait` and less than `max_wait` plus one interval.
    pub async fn wait_or_throw<F, Fut>(
        &self,
        mut condition: F,
        description: &str,
    ) -> Result<(), ReconciliationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let started = Instant::now();
        let mut delays = self.schedule().build();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if condition().await {
                tracing::debug!(description, attempts, elapsed = ?started.elapsed(), "converged");
                return Ok(());
            }

            let elapsed = started.elapsed();
            if elapsed >= self.max_wait {
                tracing::warn!(description, attempts, ?elapsed, "convergence timed out");
                return Err(ReconciliationError::ConvergenceTimeout {
                    description: description.to_string(),
                    elapsed,
                });
            }

            let remaining = self.max_wait - elapsed;
            let delay = delays.next().unwrap_or(remaining).min(remaining);
            tracing::trace!(description, attempts, ?delay, "not converged yet");
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryWithExponentialBackoff {
    fn default() -> Self {
        Self::one_minute_waiter()
    }
}
