//! Wait-loop scheduling for callers that lost the race for a producer lock.

use async_trait::async_trait;
use std::time::Duration;

/// How the delay between polls grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Every poll waits `poll_interval`.
    #[default]
    Fixed,
    /// The delay doubles after each poll, capped at `max_delay`.
    Exponential { max_delay: Duration },
}

/// Bounded polling policy for the wait loop.
///
/// `max_attempts` × delay is a soft timeout: once it is spent the waiter stops
/// polling and produces the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            poll_interval: Duration::from_millis(100),
            max_attempts: 50,
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(poll_interval: Duration, max_attempts: u32) -> Self {
        RetryPolicy {
            poll_interval,
            max_attempts,
            backoff: Backoff::Fixed,
        }
    }

    pub fn exponential(poll_interval: Duration, max_attempts: u32, max_delay: Duration) -> Self {
        RetryPolicy {
            poll_interval,
            max_attempts,
            backoff: Backoff::Exponential { max_delay },
        }
    }

    /// Delay before the given poll (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.poll_interval,
            Backoff::Exponential { max_delay } => {
                let shift = attempt.saturating_sub(1).min(31);
                self.poll_interval
                    .checked_mul(1u32 << shift)
                    .unwrap_or(max_delay)
                    .min(max_delay)
            }
        }
    }

    /// Upper bound on the time spent sleeping in the wait loop.
    pub fn budget(&self) -> Duration {
        (1..=self.max_attempts).map(|attempt| self.delay(attempt)).sum()
    }
}

/// Suspends the wait loop between polls.
///
/// Swap the implementation in tests to drive contention deterministically
/// without real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
