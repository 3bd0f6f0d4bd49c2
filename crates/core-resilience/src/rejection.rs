//! Rejected-execution handlers
//!
//! A [`RejectedExecutionHandler`] decides what happens to a task the
//! [`RateLimiter`] could not admit. The limiter makes no assumption beyond
//! the call signature: a handler may fail fast, wait and re-try, route the
//! task elsewhere, or synthesise a result.
//!
//! # Example
//!
//! ```no_run
//! use steadfast_core_resilience::{RateLimiter, Task, WaitAndRetry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Sleep out the wait estimate instead of failing, at most 5 times per task
//! let limiter: RateLimiter<u32, std::io::Error> =
//!     RateLimiter::new(10, 10)?.with_handler(WaitAndRetry::new().with_max_waits(5));
//!
//! for i in 0..10 {
//!     limiter.execute(Task::new(move || async move { Ok(i) })).await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::ExecutionError;
use crate::rate_limiter::RateLimiter;
use crate::task::Task;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Decides the fate of a task that failed admission
#[async_trait]
pub trait RejectedExecutionHandler<T, E>: Send + Sync {
    /// Handle a rejected task
    ///
    /// `wait` is the limiter's estimate of when a permit will be available.
    async fn reject(
        &self,
        limiter: &RateLimiter<T, E>,
        task: Task<T, E>,
        wait: Duration,
    ) -> Result<T, ExecutionError<E>>;
}

/// Fail immediately with [`ExecutionError::Rejected`]; never sleeps
///
/// This is the limiter's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailFast;

#[async_trait]
impl<T, E> RejectedExecutionHandler<T, E> for FailFast
where
    T: Send + 'static,
    E: Send + 'static,
{
    async fn reject(
        &self,
        _limiter: &RateLimiter<T, E>,
        _task: Task<T, E>,
        wait: Duration,
    ) -> Result<T, ExecutionError<E>> {
        Err(ExecutionError::Rejected { wait })
    }
}

/// Sleep for the wait estimate, then try admission again
///
/// Uncapped by default, so a task is retried for as long as it takes.
/// [`with_max_waits`](Self::with_max_waits) bounds the number of sleeps;
/// once exhausted the last rejection is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitAndRetry {
    max_waits: Option<u32>,
}

impl WaitAndRetry {
    /// Create an uncapped wait-and-retry handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up after `max_waits` sleeps
    pub fn with_max_waits(mut self, max_waits: u32) -> Self {
        self.max_waits = Some(max_waits);
        self
    }

    /// Configured cap on sleeps, if any
    pub fn max_waits(&self) -> Option<u32> {
        self.max_waits
    }
}

#[async_trait]
impl<T, E> RejectedExecutionHandler<T, E> for WaitAndRetry
where
    T: Send + 'static,
    E: Send + 'static,
{
    async fn reject(
        &self,
        limiter: &RateLimiter<T, E>,
        task: Task<T, E>,
        wait: Duration,
    ) -> Result<T, ExecutionError<E>> {
        let mut wait = wait;
        let mut waits: u32 = 0;

        loop {
            if self.max_waits.is_some_and(|max| waits >= max) {
                return Err(ExecutionError::Rejected { wait });
            }

            tokio::time::sleep(wait).await;
            waits += 1;

            match limiter.try_execute(&task).await {
                Err(ExecutionError::Rejected { wait: next }) => {
                    debug!(
                        waits,
                        wait_ms = next.as_millis() as u64,
                        "still rate limited after waiting"
                    );
                    wait = next;
                }
                outcome => return outcome,
            }
        }
    }
}

/// Answer a rejected task with a synthesised value instead of running it
pub struct Fallback<F> {
    fallback: F,
}

impl<F> Fallback<F> {
    /// Use `fallback(wait)` as the result of every rejected task
    pub fn new(fallback: F) -> Self {
        Self { fallback }
    }
}

impl<F> fmt::Debug for Fallback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback").finish_non_exhaustive()
    }
}

#[async_trait]
impl<T, E, F> RejectedExecutionHandler<T, E> for Fallback<F>
where
    T: Send + 'static,
    E: Send + 'static,
    F: Fn(Duration) -> T + Send + Sync,
{
    async fn reject(
        &self,
        _limiter: &RateLimiter<T, E>,
        _task: Task<T, E>,
        wait: Duration,
    ) -> Result<T, ExecutionError<E>> {
        debug!(
            wait_ms = wait.as_millis() as u64,
            "rate limited, answering with fallback"
        );
        Ok((self.fallback)(wait))
    }
}
