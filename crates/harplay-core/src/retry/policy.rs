use std::time::Duration;

use super::classify::{classify_http_status, StatusClass};

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Report the failure; do not retry.
    NoRetry,
    /// Start another attempt after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff state: each delay handed out doubles the next one,
/// capped at `max`. The first delay is `initial` as given, even above `max`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial,
            max,
        }
    }

    /// Delay the next retry will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Returns the current delay and advances to `min(2 * current, max)`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }
}

/// Retry budget plus backoff for one `load` run.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first failed attempt.
    pub max_retry: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retry: u32, backoff: Backoff) -> Self {
        Self { max_retry, backoff }
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Decide what to do with a completed, non-successful attempt.
    ///
    /// `retry_count` is the number of retries already scheduled in this run.
    /// Client errors are never retried; everything else is retried while the
    /// budget lasts.
    pub fn decide(&mut self, retry_count: u32, status: u16) -> RetryDecision {
        if retry_count >= self.max_retry {
            return RetryDecision::NoRetry;
        }
        match classify_http_status(status) {
            StatusClass::Retryable => RetryDecision::RetryAfter(self.backoff.next_delay()),
            StatusClass::Success | StatusClass::ClientError => RetryDecision::NoRetry,
        }
    }
}
