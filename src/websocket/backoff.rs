use rand::Rng;
use std::time::Duration;

use crate::config::BackoffPolicy;

/// Reconnect delay calculator driven by a [`BackoffPolicy`]
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    policy: BackoffPolicy,
    current_delay: Duration,
}

impl Backoff {
    pub(crate) fn new(policy: BackoffPolicy) -> Self {
        let current_delay = Self::initial_delay(&policy);
        Self {
            policy,
            current_delay,
        }
    }

    fn initial_delay(policy: &BackoffPolicy) -> Duration {
        match policy {
            BackoffPolicy::Fixed(delay) => *delay,
            BackoffPolicy::Exponential { initial_delay, .. } => *initial_delay,
        }
    }

    /// Get the next delay duration
    pub(crate) fn next_delay(&mut self) -> Duration {
        match &self.policy {
            BackoffPolicy::Fixed(delay) => *delay,
            BackoffPolicy::Exponential {
                max_delay,
                multiplier,
                jitter,
                ..
            } => {
                let delay = self.current_delay;
                // Overflow, NaN and negative products all saturate at the cap
                self.current_delay =
                    Duration::try_from_secs_f64(delay.as_secs_f64() * multiplier)
                        .map_or(*max_delay, |next| std::cmp::min(next, *max_delay));

                if *jitter && !delay.is_zero() {
                    let half = u64::try_from(delay.as_millis() / 2).unwrap_or(u64::MAX);
                    let extra = rand::thread_rng().gen_range(0..=half);
                    delay.saturating_add(Duration::from_millis(extra))
                } else {
                    delay
                }
            }
        }
    }

    /// Reset the backoff to initial delay
    pub(crate) fn reset(&mut self) {
        self.current_delay = Self::initial_delay(&self.policy);
    }
}
