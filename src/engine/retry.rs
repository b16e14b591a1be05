//! Bounded retry with a fixed delay between attempts.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// Re-invokes a fallible async operation up to `attempts` times.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    attempts: u32,
    delay: Duration,
}

impl RetryExecutor {
    /// A budget of zero is treated as one attempt.
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.attempts, config.delay())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `op`, retrying on every error.
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_while(label, op, |_| true).await
    }

    /// Run `op`, retrying only errors for which `should_retry` holds.
    ///
    /// The last error is returned as-is once the budget is spent.
    pub async fn run_while<T, E, F, Fut, P>(&self, label: &str, mut op: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.attempts && should_retry(&err) => {
                    tracing::warn!(
                        operation = label,
                        attempt,
                        max_attempts = self.attempts,
                        delay_secs = self.delay.as_secs(),
                        error = %err,
                        "Operation failed, retrying after delay"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
