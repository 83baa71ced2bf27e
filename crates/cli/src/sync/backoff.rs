// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff with jitter for failed queue items.

use std::time::Duration;

use rand::Rng;

/// Retry delay policy: `base * 2^(attempt - 1)`, capped at `max`, plus up
/// to 25% random jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Backoff { base, max }
    }

    /// Delay before retrying after `attempt` failures, without jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// [`Backoff::delay`] plus up to a quarter of it again, so clients that
    /// failed together do not retry together.
    pub fn delay_with_jitter<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.delay(attempt);
        let spread = u64::try_from(delay.as_millis() / 4).unwrap_or(u64::MAX);
        delay.saturating_add(Duration::from_millis(rng.gen_range(0..=spread)))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(Duration::from_secs(2), Duration::from_secs(300))
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
