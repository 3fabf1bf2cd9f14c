use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::smtp_verify::{SmtpCheck, SmtpCheckError, SmtpResult};
use crate::validator::error::ValidateError;

/// How often and how patiently a failed SMTP check is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_delays(mut self, base: Duration, max: Duration) -> Self {
        self.base_delay = base;
        self.max_delay = max;
        self
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Pause before attempt `attempt + 1`: `base * 2^(attempt-1)` with up to
    /// 50% jitter added, never above `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let ceiling = self
            .base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay);
        if ceiling.is_zero() {
            return ceiling;
        }
        let jitter_ms = (ceiling.as_millis() / 2) as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        (ceiling + jitter).min(self.max_delay)
    }

    /// Runs `check` until it succeeds or the attempts run out.
    pub(crate) fn run<C: SmtpCheck>(
        &self,
        check: &C,
        domain: &str,
        username: &str,
    ) -> Result<Option<SmtpResult>, ValidateError> {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match check.check_smtp(domain, username) {
                Ok(result) => return Ok(result),
                Err(err) if attempt < attempts && is_retryable(&err) => {
                    let delay = self.backoff(attempt);
                    warn!(
                        target: "mailprobe::retry",
                        domain,
                        attempt,
                        of = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "smtp check failed, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(source) => {
                    return Err(ValidateError::VerificationFailed {
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}

/// Configuration problems fail the same way on every attempt.
fn is_retryable(err: &SmtpCheckError) -> bool {
    !matches!(
        err,
        SmtpCheckError::InvalidProxy { .. } | SmtpCheckError::ResolverInit { .. }
    )
}
