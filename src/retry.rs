//! Bounded retry with fixed delay.
//!
//! Deliberately simple: no jitter, no exponential backoff. The client only
//! retries low-frequency administrative operations a small, bounded number
//! of times, so a fixed delay is enough.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Fixed-delay retry policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySpec {
    /// Total number of attempts. Zero means never try: the operation fails
    /// immediately without being invoked.
    #[serde(default)]
    pub attempts: u32,

    /// Seconds to wait between attempts. Negative values are treated as
    /// zero.
    #[serde(default, rename = "delay")]
    pub delay_seconds: i64,
}

impl RetrySpec {
    /// Delay between attempts as a `Duration`.
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds.max(0) as u64)
    }
}

/// Outcome of a retry loop that never produced a success.
#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    /// The policy allowed zero attempts, so the operation was never tried.
    #[error("retry policy allows no attempts")]
    NoAttempts,

    /// Every attempt failed; carries the last error observed.
    #[error("all {attempts} attempts failed: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },
}

impl<E: std::error::Error + 'static> RetryError<E> {
    /// The last underlying error, if any attempt ran at all.
    pub fn into_last(self) -> Option<E> {
        match self {
            RetryError::NoAttempts => None,
            RetryError::Exhausted { last, .. } => Some(last),
        }
    }
}

/// Run `op` up to `spec.attempts` times, sleeping `spec.delay()` between
/// attempts. `on_retry` observes every failed attempt with its 1-based
/// number, before the delay.
///
/// Blocks the calling thread for up to `attempts × delay` wall-clock time.
pub fn retry_fixed<T, E>(
    spec: RetrySpec,
    mut on_retry: impl FnMut(u32, &E),
    mut op: impl FnMut() -> std::result::Result<T, E>,
) -> std::result::Result<T, RetryError<E>>
where
    E: std::error::Error + 'static,
{
    let mut last = None;

    for attempt in 1..=spec.attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                on_retry(attempt, &err);
                last = Some(err);
                if attempt < spec.attempts {
                    std::thread::sleep(spec.delay());
                }
            }
        }
    }

    match last {
        Some(last) => Err(RetryError::Exhausted {
            attempts: spec.attempts,
            last,
        }),
        None => Err(RetryError::NoAttempts),
    }
}
