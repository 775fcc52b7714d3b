//! Backoff policies and the retry adapter shared by the exec and query paths.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::SqlFetchError;

/// A backoff schedule for one call.
///
/// Constructed by the caller, handed to the builder, and discarded when the
/// call completes. Errors classified permanent by
/// [`SqlFetchError::is_permanent`] stop the schedule regardless of how many
/// attempts remain.
///
/// ```rust
/// use std::time::Duration;
/// use sql_fetch::prelude::*;
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(50))
///     .with_max_elapsed(Duration::from_secs(5))
///     .with_max_attempts(4);
/// # let _ = policy;
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    kind: BackoffKind,
    max_attempts: Option<u32>,
    max_elapsed: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
enum BackoffKind {
    Exponential { base: Duration },
    Constant { interval: Duration },
}

impl RetryPolicy {
    /// Exponential backoff: the wait starts at `base` and doubles after
    /// every failed attempt.
    #[must_use]
    pub fn exponential(base: Duration) -> Self {
        Self {
            kind: BackoffKind::Exponential { base },
            max_attempts: None,
            max_elapsed: None,
        }
    }

    /// Constant-delay backoff: every wait is `interval`. Unbounded unless
    /// capped with [`RetryPolicy::with_max_attempts`].
    #[must_use]
    pub fn constant(interval: Duration) -> Self {
        Self {
            kind: BackoffKind::Constant { interval },
            max_attempts: None,
            max_elapsed: None,
        }
    }

    /// Cap the total number of attempts (including the first).
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Stop retrying once this much time has passed since the first attempt.
    #[must_use]
    pub fn with_max_elapsed(mut self, limit: Duration) -> Self {
        self.max_elapsed = Some(limit);
        self
    }

    pub(crate) fn schedule(&self) -> BackoffSchedule {
        let next_interval = match self.kind {
            BackoffKind::Exponential { base } => base,
            BackoffKind::Constant { interval } => interval,
        };
        BackoffSchedule {
            kind: self.kind,
            max_attempts: self.max_attempts,
            max_elapsed: self.max_elapsed,
            started: Instant::now(),
            next_interval,
            attempts: 0,
        }
    }
}

/// Mutable scheduling state for one call.
pub(crate) struct BackoffSchedule {
    kind: BackoffKind,
    max_attempts: Option<u32>,
    max_elapsed: Option<Duration>,
    started: Instant,
    next_interval: Duration,
    attempts: u32,
}

impl BackoffSchedule {
    /// Record a completed attempt and return how long to wait before the
    /// next one, or `None` when the schedule is exhausted.
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        self.attempts += 1;
        if let Some(max) = self.max_attempts {
            if self.attempts >= max {
                return None;
            }
        }
        let delay = match self.kind {
            BackoffKind::Constant { interval } => interval,
            BackoffKind::Exponential { .. } => {
                let current = self.next_interval;
                self.next_interval = self.next_interval.saturating_mul(2);
                current
            }
        };
        if let Some(limit) = self.max_elapsed {
            if self.started.elapsed() + delay > limit {
                return None;
            }
        }
        Some(delay)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts
    }
}

pub(crate) type AttemptFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, SqlFetchError>> + Send + 'a>>;

/// Drive `attempt` against the policy until it succeeds, fails permanently,
/// or the schedule runs out. Without a policy exactly one attempt is made.
/// Sleeps race the cancellation token so a canceled call stops promptly.
pub(crate) async fn run_with_retry<C, T, F>(
    cancel: &CancellationToken,
    policy: Option<&RetryPolicy>,
    ctx: &mut C,
    mut attempt: F,
) -> Result<T, SqlFetchError>
where
    F: for<'a> FnMut(&'a mut C) -> AttemptFuture<'a, T>,
{
    if cancel.is_cancelled() {
        return Err(SqlFetchError::Canceled);
    }
    let Some(policy) = policy else {
        return attempt(ctx).await;
    };
    let mut schedule = policy.schedule();
    loop {
        match attempt(ctx).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_permanent() => return Err(err),
            Err(err) => {
                let Some(delay) = schedule.next_delay() else {
                    return Err(err);
                };
                tracing::debug!(
                    attempt = schedule.attempts(),
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after transient error"
                );
                tokio::select! {
                    () = cancel.cancelled() => return Err(SqlFetchError::Canceled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
