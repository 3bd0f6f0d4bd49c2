//! Resilient executor: the retry loop
//!
//! Per invocation the executor moves through
//! `Attempting -> {Succeeded | Aborted}`, with a `Delaying` state between
//! attempts:
//!
//! ```text
//!            ┌──────────────────────────────────────────┐
//!            ▼                                          │
//!      Attempting ──(limiter?)──► task                  │
//!            │                                          │
//!     outcome│ ──► RetryPredicate ──► RetryDecision     │
//!            │                          │               │
//!            │             Abort ◄──────┴──────► Retry  │
//!            ▼               │                     │    │
//!   Succeeded / Aborted ◄────┘                Delaying ─┘
//!
//! Attempting and Delaying are both cancellable.
//! ```
//!
//! Each call owns its attempt counter and current task; nothing is shared
//! between invocations except the predicate and the optional limiter.
//!
//! # Example
//!
//! ```no_run
//! use steadfast_core_resilience::{
//!     retry_fn, AttemptLimit, ExecutionError, RateLimiter, ResilientExecutor, RetryDecision, Task,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), ExecutionError<std::io::Error>> {
//! let limiter = Arc::new(RateLimiter::new(10, 10).expect("valid rate"));
//! let predicate = AttemptLimit::new(
//!     retry_fn(|_, failure: &ExecutionError<std::io::Error>, task: &Task<String, _>| {
//!         let delay = failure.wait_hint().unwrap_or(Duration::from_millis(50));
//!         RetryDecision::retry(delay, task.clone())
//!     }),
//!     5,
//! );
//!
//! let executor = ResilientExecutor::new(predicate).with_limiter(limiter);
//! let body = executor
//!     .call(Task::new(|| async { Ok("fetched".to_string()) }))
//!     .await?;
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

use crate::decision::RetryDecision;
use crate::error::ExecutionError;
use crate::predicate::RetryPredicate;
use crate::rate_limiter::RateLimiter;
use crate::task::Task;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs tasks under a retry predicate, optionally gated by a rate limiter
pub struct ResilientExecutor<T, E> {
    predicate: Arc<dyn RetryPredicate<T, E>>,
    limiter: Option<Arc<RateLimiter<T, E>>>,
}

impl<T, E> ResilientExecutor<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create an executor that runs tasks directly
    pub fn new<P>(predicate: P) -> Self
    where
        P: RetryPredicate<T, E> + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            limiter: None,
        }
    }

    /// Create an executor from a shared predicate
    pub fn with_shared_predicate(predicate: Arc<dyn RetryPredicate<T, E>>) -> Self {
        Self {
            predicate,
            limiter: None,
        }
    }

    /// Gate every attempt through `limiter`
    ///
    /// Rejections reach the predicate like any other failure. A closed
    /// limiter ends the call immediately.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter<T, E>>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// The limiter attempts go through, if any
    pub fn limiter(&self) -> Option<&Arc<RateLimiter<T, E>>> {
        self.limiter.as_ref()
    }

    /// Run `task` until the predicate aborts
    pub async fn call(&self, task: Task<T, E>) -> Result<T, ExecutionError<E>> {
        self.call_with_cancel(task, &CancellationToken::new()).await
    }

    /// Run `task` until the predicate aborts or `cancel` fires
    ///
    /// Cancellation is observed before every attempt, while an attempt is
    /// pending and during the delay between attempts. In every case the call
    /// ends with [`ExecutionError::Cancelled`] and no further attempt is
    /// made. A pending attempt is dropped at its next await point, which also
    /// stops a rejection handler that is waiting for a permit.
    pub async fn call_with_cancel(
        &self,
        task: Task<T, E>,
        cancel: &CancellationToken,
    ) -> Result<T, ExecutionError<E>> {
        let mut current = task;
        let mut attempt: u32 = 1;

        loop {
            if cancel.is_cancelled() {
                debug!(attempt, "cancelled before attempt");
                return Err(ExecutionError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(attempt, "cancelled during attempt");
                    return Err(ExecutionError::Cancelled);
                }
                outcome = self.attempt(&current) => outcome,
            };
            if matches!(outcome, Err(ExecutionError::Closed)) {
                warn!(attempt, "rate limiter closed, giving up");
                return outcome;
            }

            let decision = match &outcome {
                Ok(value) => self.predicate.on_result(attempt, value, &current),
                Err(failure) => self.predicate.on_failure(attempt, failure, &current),
            };

            match decision {
                RetryDecision::Abort { failure: None } => {
                    if outcome.is_err() {
                        warn!(attempt, "retry predicate aborted, propagating failure");
                    }
                    return outcome;
                }
                RetryDecision::Abort {
                    failure: Some(substitute),
                } => {
                    warn!(attempt, "retry predicate aborted with substitute failure");
                    return Err(substitute);
                }
                RetryDecision::Retry { delay, next } => {
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        failed = outcome.is_err(),
                        "retrying"
                    );
                    Self::delay(delay, cancel).await?;
                    current = next;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    async fn attempt(&self, task: &Task<T, E>) -> Result<T, ExecutionError<E>> {
        match &self.limiter {
            Some(limiter) => limiter.execute(task.clone()).await,
            None => task.call().await.map_err(ExecutionError::Task),
        }
    }

    /// The Delaying state; returns early with `Cancelled`
    async fn delay(delay: Duration, cancel: &CancellationToken) -> Result<(), ExecutionError<E>> {
        if delay.is_zero() {
            // Still give other tasks (and a canceller) a chance to run
            tokio::task::yield_now().await;
            return if cancel.is_cancelled() {
                Err(ExecutionError::Cancelled)
            } else {
                Ok(())
            };
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cancelled while delaying");
                Err(ExecutionError::Cancelled)
            }
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

impl<T, E> Clone for ResilientExecutor<T, E> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            limiter: self.limiter.clone(),
        }
    }
}

impl<T, E> fmt::Debug for ResilientExecutor<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
