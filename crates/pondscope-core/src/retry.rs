//! Retry policy with exponential backoff and explicit failure classification.

use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::Serialize;

/// Why a single upstream attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// HTTP 429.
    RateLimited,
    /// Connection, timeout, or body read failure.
    Transport,
    /// Any other non-2xx status.
    Status,
    /// 2xx response whose payload carries an `error` field.
    Application,
}

impl FailureClass {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Transport => "transport",
            Self::Status => "status",
            Self::Application => "application",
        }
    }
}

impl Display for FailureClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed {
        delay: Duration,
    },
    /// Delay is `base * (factor ^ attempt)`, capped at `max`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        /// Apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(1_000),
            factor: 2.0,
            max: Duration::from_secs(8),
            jitter: false,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt + 1` (0-based `attempt` is the one that failed).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Configuration for the fetch layer's retry loop.
///
/// Rate-limited attempts get the full retry budget. Every other failure class is
/// retried at most once, right after the first attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32, base: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Exponential {
                base,
                factor: 2.0,
                max: base.saturating_mul(8),
                jitter: false,
            },
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Decides whether the failed `attempt` (0-based) is followed by another one.
    ///
    /// Returns the delay to wait first, or `None` to give up.
    pub fn next_delay(&self, class: FailureClass, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }

        match class {
            FailureClass::RateLimited => Some(self.backoff.delay(attempt)),
            FailureClass::Transport | FailureClass::Status | FailureClass::Application
                if attempt == 0 =>
            {
                Some(self.backoff.delay(attempt))
            }
            FailureClass::Transport | FailureClass::Status | FailureClass::Application => None,
        }
    }
}
