use std::time::Duration;

use rand::Rng;

use crate::data_model::LabelOrError;
use crate::error::RequestError;

/// Upper bound of the random term added to every backoff delay.
pub const MAX_JITTER: Duration = Duration::from_secs(1);

/// Exponential backoff with jitter: `base * 2^attempt + U(0, 1s)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

/// States of one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    /// Attempt `n` (zero-based) is about to be sent.
    Attempting(u32),
    /// A transient failure happened; sleep, then try `next_attempt`.
    WaitingToRetry { next_attempt: u32, delay: Duration },
    Finished(LabelOrError),
}

impl RetryPolicy {
    /// `max_attempts` counts every attempt, the first one included; at least
    /// one attempt is always made.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `attempt`. `jitter` is a fraction in `[0, 1)`.
    pub fn backoff_delay(&self, attempt: u32, jitter: f64) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let exponential = self.base_delay.saturating_mul(factor);
        exponential.saturating_add(MAX_JITTER.mul_f64(jitter.clamp(0.0, 1.0)))
    }

    /// Draws a fresh jitter fraction. Called once per failed attempt so that
    /// concurrently failing requests spread out.
    pub fn sample_jitter() -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }

    /// Next state after attempt `attempt` failed with `error`.
    pub fn on_failure(&self, attempt: u32, error: &RequestError, jitter: f64) -> AttemptState {
        if !error.is_retryable() {
            return AttemptState::Finished(LabelOrError::Failed(error.to_string()));
        }
        if attempt + 1 >= self.max_attempts {
            return AttemptState::Finished(LabelOrError::Failed(format!(
                "达到最大重试次数 - {}",
                error
            )));
        }
        AttemptState::WaitingToRetry {
            next_attempt: attempt + 1,
            delay: self.backoff_delay(attempt, jitter),
        }
    }
}
