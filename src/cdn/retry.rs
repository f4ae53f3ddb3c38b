use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

use super::CdnError;

/// Exponential backoff: `base * 2^attempt` between attempts (1s, 2s, 4s, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, CdnError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CdnError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        operation,
                        attempt + 1,
                        self.max_attempts,
                        e
                    );
                    tokio::time::sleep(self.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!("{} failed after {} attempts: {}", operation, self.max_attempts, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
