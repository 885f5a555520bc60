//! Bounded retry of remote calls.
//!
//! A [`RetryPolicy`] gives a remote call a time budget. [`retry_if`] re-invokes
//! the call with exponential backoff while the predicate classifies the error
//! as transient and the next attempt still fits in the budget.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::warn;

use crate::error::ProviderError;

/// Time budget and backoff for retrying one remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    budget: Duration,
    initial_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// A policy with the given budget and default backoff (500ms doubling,
    /// capped at 5s).
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }

    /// Budget for creating a product.
    pub fn create() -> Self {
        Self::new(Duration::from_secs(20))
    }

    /// Budget for updating a product.
    pub fn update() -> Self {
        Self::new(Duration::from_secs(5))
    }

    /// Budget for deleting a product.
    pub fn delete() -> Self {
        Self::new(Duration::from_secs(5))
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Set the delay before the second attempt.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the upper bound for any single delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the total budget.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// The total budget.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// The delay after the given failed attempt (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Retry `call` while `should_retry` accepts its error and the budget lasts.
///
/// Errors the predicate rejects are returned unchanged. When the budget runs
/// out the last error is wrapped in [`ProviderError::RetriesExhausted`].
pub async fn retry_if<T, F, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    should_retry: P,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    P: Fn(&ProviderError) -> bool,
{
    let deadline = Instant::now() + policy.budget;
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) if !should_retry(&err) => return Err(err),
            Err(err) => err,
        };

        let delay = policy.delay_after(attempt);
        if Instant::now() + delay >= deadline {
            return Err(ProviderError::RetriesExhausted {
                operation: operation.to_string(),
                attempts: attempt,
                last: Box::new(err),
            });
        }

        warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Transient error, retrying"
        );
        sleep(delay).await;
    }
}

/// Retry `call` on errors classified by [`ProviderError::is_retryable`].
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    retry_if(policy, operation, ProviderError::is_retryable, call).await
}
