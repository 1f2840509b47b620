//! Retry backoff for authentication attempts.
//!
//! `delay(attempt) = min(base * 2^attempt, ceiling)` with a zero-based
//! attempt counter. The ceiling bounds the delay, never the number of
//! attempts.

use serde::Deserialize;
use std::time::Duration;

/// Exponential backoff with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Backoff {
    /// Delay before the first attempt, in milliseconds.
    #[serde(default = "default_base_ms")]
    pub base_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_ceiling_ms")]
    pub ceiling_ms: u64,
}

fn default_base_ms() -> u64 {
    1000
}

fn default_ceiling_ms() -> u64 {
    5 * 60 * 1000 // 5 minutes
}

impl Backoff {
    /// Create a backoff from a base delay and a ceiling.
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        Self {
            base_ms: base.as_millis() as u64,
            ceiling_ms: ceiling.as_millis() as u64,
        }
    }

    /// Delay to wait before the given zero-based attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let scaled = 1u64
            .checked_shl(attempt)
            .and_then(|factor| self.base_ms.checked_mul(factor))
            .unwrap_or(u64::MAX);
        Duration::from_millis(scaled.min(self.ceiling_ms))
    }

    /// The ceiling as a `Duration`.
    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(self.ceiling_ms)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_ms: default_base_ms(),
            ceiling_ms: default_ceiling_ms(),
        }
    }
}
