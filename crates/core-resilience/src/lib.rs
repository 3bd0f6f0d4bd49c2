//! Steadfast Core Resilience: a resilient invocation engine
//!
//! # Overview
//!
//! This crate wraps an arbitrary unit of work so that it is subject to
//! admission control against a configured rate, and retried according to a
//! pluggable policy when it fails or is rejected. It includes:
//!
//! - **Permit Bucket**: Tick-quantised token accounting with a capacity ceiling
//! - **Rate Limiter**: Owns a bucket, admits or rejects tasks, closes for good
//! - **Rejection Handlers**: Fail fast, wait and retry, or answer with a fallback
//! - **Retry Decision**: Immutable Abort/Retry outcome of a retry policy
//! - **Retry Predicate**: Caller-supplied policy consulted after every attempt
//! - **Resilient Executor**: The retry loop tying it all together
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - What the wrapped tasks do
//! - Any particular retry policy (backoff, jitter, ...)
//! - Cross-process coordination: limiters are single-process and in-memory
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Your Application                │
//! └─────────────┬───────────────────────────┘
//!               │ Task
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Resilient Executor                │  ← Retry loop
//! │  (Attempting → Delaying → ...)          │
//! └─────────────┬───────────────▲───────────┘
//!               │               │ RetryDecision
//!               │        ┌──────┴──────────┐
//!               │        │ Retry Predicate │  ← Your policy
//!               │        └─────────────────┘
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Rate Limiter                      │  ← Admission control
//! │  (Permit bucket, lazy accrual)          │
//! └─────────────┬───────────────────────────┘
//!               │ rejected?
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Rejected Execution Handler        │  ← Fail fast / wait / fallback
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage Example
//!
//! ## Rate Limiter
//!
//! ```no_run
//! use steadfast_core_resilience::{ExecutionError, RateLimiter, Task};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Up to 10 permits, replenished at 10 per second
//! let limiter: RateLimiter<u64, std::io::Error> = RateLimiter::new(10, 10)?;
//!
//! match limiter.execute(Task::new(|| async { Ok(42) })).await {
//!     Ok(value) => println!("got {}", value),
//!     Err(ExecutionError::Rejected { wait }) => println!("try again in {:?}", wait),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retrying Executor
//!
//! ```no_run
//! use steadfast_core_resilience::{
//!     retry_fn, AttemptLimit, ExecutionError, ResilientExecutor, RetryDecision, Task,
//! };
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), ExecutionError<std::io::Error>> {
//! let executor = ResilientExecutor::new(AttemptLimit::new(
//!     retry_fn(|_, _: &ExecutionError<std::io::Error>, task: &Task<u64, _>| {
//!         RetryDecision::retry(Duration::from_millis(100), task.clone())
//!     }),
//!     3,
//! ));
//!
//! let value = executor.call(Task::new(|| async { Ok(7) })).await?;
//! # let _ = value;
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod decision;
pub mod error;
pub mod executor;
pub mod predicate;
pub mod rate_limiter;
pub mod rejection;
pub mod task;

// Re-export main types for convenience
pub use bucket::PermitBucket;
pub use decision::{DecisionKind, RetryDecision};
pub use error::{ConfigError, ExecutionError};
pub use executor::ResilientExecutor;
pub use predicate::{retry_fn, AttemptLimit, FnPredicate, RetryPredicate};
pub use rate_limiter::{Admission, RateLimiter};
pub use rejection::{FailFast, Fallback, RejectedExecutionHandler, WaitAndRetry};
pub use task::Task;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use steadfast_core_resilience::prelude::*;
/// ```
pub mod prelude {
    pub use super::decision::{DecisionKind, RetryDecision};
    pub use super::error::{ConfigError, ExecutionError};
    pub use super::executor::ResilientExecutor;
    pub use super::predicate::{retry_fn, AttemptLimit, RetryPredicate};
    pub use super::rate_limiter::{Admission, RateLimiter};
    pub use super::rejection::{FailFast, Fallback, RejectedExecutionHandler, WaitAndRetry};
    pub use super::task::Task;
}
