//! Error types for the resilient invocation engine
//!
//! Two families live here:
//! - [`ConfigError`]: raised at construction time only. These never take
//!   part in a retry loop.
//! - [`ExecutionError`]: the tagged outcome of running a task through the
//!   engine. Rejection, shutdown and cancellation are engine-level variants;
//!   anything the task itself fails with is carried verbatim in `Task`.

use std::time::Duration;
use thiserror::Error;

/// Invalid configuration detected while building a limiter or a decision
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The bucket must be able to hold at least one permit
    #[error("capacity must be at least 1")]
    ZeroCapacity,

    /// A rate of zero would never admit anything
    #[error("rate per second must be at least 1")]
    ZeroRate,

    /// The rate does not split one second into whole-millisecond ticks
    #[error("rate of {rate}/s does not divide 1000 ms into whole-millisecond ticks")]
    RateNotDivisible { rate: u32 },

    /// A request for more permits than the bucket can ever hold
    #[error("requested {requested} permits but capacity is {capacity}")]
    PermitsExceedCapacity { requested: u32, capacity: u32 },

    /// Abort decisions cannot carry a delay
    #[error("cannot add a delay to an abort decision ({delay:?})")]
    AbortWithDelay { delay: Duration },

    /// Retry decisions need a task to run on the next attempt
    #[error("retry decision requires a next task")]
    MissingRetryTask,
}

/// Failure of a single execution through the engine
///
/// `E` is the task's own error type. The engine never inspects it.
#[derive(Debug, Clone, Error)]
pub enum ExecutionError<E> {
    /// No permit was available and the rejection handler did not override it
    #[error("rate limit exceeded, next permit in {} ms", wait.as_millis())]
    Rejected { wait: Duration },

    /// The rate limiter was closed before admission
    #[error("rate limiter is closed")]
    Closed,

    /// Execution was cancelled by the caller while waiting between attempts
    #[error("execution cancelled")]
    Cancelled,

    /// The task itself failed
    #[error(transparent)]
    Task(E),
}

impl<E> ExecutionError<E> {
    /// Check if this is an admission rejection
    pub fn is_rejected(&self) -> bool {
        matches!(self, ExecutionError::Rejected { .. })
    }

    /// Check if the limiter was closed
    pub fn is_closed(&self) -> bool {
        matches!(self, ExecutionError::Closed)
    }

    /// Check if the execution was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionError::Cancelled)
    }

    /// Check if the task itself failed
    pub fn is_task(&self) -> bool {
        matches!(self, ExecutionError::Task(_))
    }

    /// Estimated wait before a permit becomes available, for rejections
    pub fn wait_hint(&self) -> Option<Duration> {
        match self {
            ExecutionError::Rejected { wait } => Some(*wait),
            _ => None,
        }
    }

    /// Borrow the task's failure, if that is what this is
    pub fn task_error(&self) -> Option<&E> {
        match self {
            ExecutionError::Task(e) => Some(e),
            _ => None,
        }
    }

    /// Take the task's failure, if that is what this is
    pub fn into_task_error(self) -> Option<E> {
        match self {
            ExecutionError::Task(e) => Some(e),
            _ => None,
        }
    }
}
