//! Bounded exponential-backoff retry for remote calls.
//!
//! Each failure is classified; only transient failures are retried. Delays
//! are applied through a [`Sleeper`] so tests can observe them without
//! waiting.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::{classify, FailureCategory};
use crate::errors::{RemoteError, TerminalFailure};

/// Jitter strategy applied on top of the capped exponential delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter
    #[default]
    None,
    /// Random from 0 to delay
    Full,
    /// Half fixed, half random
    Equal,
}

/// Retry budget and delay schedule for one kind of call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt, in milliseconds.
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Jitter strategy.
    pub jitter_strategy: JitterStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 4_000,
            max_delay_ms: 10_000,
            jitter_strategy: JitterStrategy::None,
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy (3 attempts, 4s base, 10s cap).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy for fetching the transcript.
    #[must_use]
    pub fn fetch() -> Self {
        Self::default()
    }

    /// Policy for summarization.
    #[must_use]
    pub fn summarize() -> Self {
        Self::default()
    }

    /// Policy for study-note generation.
    #[must_use]
    pub fn notes() -> Self {
        Self::default().with_max_attempts(5)
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }

    /// Attempts actually allowed; at least one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the attempt following failed attempt `attempt` (1-based):
    /// `min(max, base * 2^(attempt-1))`, then jitter.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let delay = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(self.max_delay_ms);

        let jittered = match self.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

/// One attempt made by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based attempt number.
    pub attempt_number: u32,
    /// Delay slept after this attempt, if another one followed.
    pub delay_applied: Option<Duration>,
    /// Category of the failure; `None` if the attempt succeeded.
    pub category: Option<FailureCategory>,
    /// Whether this attempt ended the loop.
    pub terminal: bool,
}

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleeps for the given duration.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs fallible remote operations under a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryExecutor {
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(Arc::new(TokioSleeper))
    }
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor").finish_non_exhaustive()
    }
}

impl RetryExecutor {
    /// Creates an executor using the given sleeper.
    #[must_use]
    pub fn new(sleeper: Arc<dyn Sleeper>) -> Self {
        Self { sleeper }
    }

    /// Runs `operation` until it succeeds, fails non-transiently, or the
    /// policy's attempts are used up.
    pub async fn execute<T, F, Fut>(
        &self,
        policy: &RetryPolicy,
        operation: F,
    ) -> Result<T, TerminalFailure>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, RemoteError>> + Send,
        T: Send,
    {
        self.execute_recorded(policy, operation).await.0
    }

    /// Same as [`execute`](Self::execute), also returning every attempt made.
    pub async fn execute_recorded<T, F, Fut>(
        &self,
        policy: &RetryPolicy,
        mut operation: F,
    ) -> (Result<T, TerminalFailure>, Vec<RetryAttempt>)
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, RemoteError>> + Send,
        T: Send,
    {
        let max_attempts = policy.attempts();
        let mut attempts = Vec::new();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(value) => {
                    attempts.push(RetryAttempt {
                        attempt_number: attempt,
                        delay_applied: None,
                        category: None,
                        terminal: true,
                    });
                    return (Ok(value), attempts);
                }
                Err(error) => error,
            };

            let category = classify(&error);

            if !category.is_retryable() {
                tracing::warn!(
                    service = %error.service,
                    attempt,
                    category = %category,
                    error = %error.message,
                    "Non-retryable failure"
                );
                attempts.push(RetryAttempt {
                    attempt_number: attempt,
                    delay_applied: None,
                    category: Some(category),
                    terminal: true,
                });
                return (
                    Err(TerminalFailure::NonRetryable {
                        category,
                        attempt,
                        error,
                    }),
                    attempts,
                );
            }

            if attempt >= max_attempts {
                tracing::error!(
                    service = %error.service,
                    attempts = attempt,
                    error = %error.message,
                    "Retries exhausted"
                );
                attempts.push(RetryAttempt {
                    attempt_number: attempt,
                    delay_applied: None,
                    category: Some(category),
                    terminal: true,
                });
                return (
                    Err(TerminalFailure::RetriesExhausted {
                        attempts: attempt,
                        last_error: error,
                    }),
                    attempts,
                );
            }

            let delay = policy.delay_for(attempt);
            tracing::warn!(
                service = %error.service,
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error.message,
                "Transient failure, retrying"
            );
            attempts.push(RetryAttempt {
                attempt_number: attempt,
                delay_applied: Some(delay),
                category: Some(category),
                terminal: false,
            });
            self.sleeper.sleep(delay).await;
        }
    }
}
