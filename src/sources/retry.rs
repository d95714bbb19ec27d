use crate::config::RetryConfig;
use crate::sources::error::SourceError;
use log::{debug, warn};
use std::future::Future;
use std::time::Duration;

/// Bounded retry with exponential backoff for transient failures and a fixed
/// cooldown after a rate-limit signal.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    rate_limit_cooldown: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_secs(config.rate_limit_cooldown_secs),
        )
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, rate_limit_cooldown: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            rate_limit_cooldown,
        }
    }

    /// Delay after the failed attempt number `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Runs `operation` until it succeeds or attempts run out.
    ///
    /// [`SourceError::NoData`] ends the loop at once with an empty result.
    /// Exhaustion also yields an empty result: the window becomes a gap that
    /// imputation fills later.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Vec<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Vec<T>, SourceError>>,
    {
        for attempt in 0..self.max_attempts {
            let is_last = attempt + 1 == self.max_attempts;
            match operation().await {
                Ok(items) => return items,
                Err(SourceError::NoData(_)) => {
                    debug!("{}: upstream reports no data", label);
                    return Vec::new();
                }
                Err(e) if e.is_rate_limit() => {
                    warn!(
                        "{}: rate limited (attempt {}/{}), cooling down {:?}",
                        label,
                        attempt + 1,
                        self.max_attempts,
                        self.rate_limit_cooldown
                    );
                    if !is_last {
                        tokio::time::sleep(self.rate_limit_cooldown).await;
                    }
                }
                Err(e) => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "{}: attempt {}/{} failed: {}. Retrying in {:?}",
                        label,
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay
                    );
                    if !is_last {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        warn!(
            "{}: giving up after {} attempts, recording a gap",
            label, self.max_attempts
        );
        Vec::new()
    }
}
