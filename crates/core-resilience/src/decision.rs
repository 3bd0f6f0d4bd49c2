//! Retry decisions
//!
//! A [`RetryDecision`] is what a [`RetryPredicate`](crate::RetryPredicate)
//! returns after looking at one attempt. It has exactly two states:
//! - **Abort** (terminal): stop. Surface the substitute failure if one is
//!   given, otherwise whatever the attempt produced.
//! - **Retry**: wait `delay`, then run `next`.
//!
//! Decisions are immutable values. Abort never carries a delay and Retry
//! always carries a task; the enum makes both rules structural, and
//! [`RetryDecision::from_parts`] enforces them for callers that assemble a
//! decision from loose fields.

use crate::error::{ConfigError, ExecutionError};
use crate::task::Task;
use std::fmt;
use std::time::Duration;

/// The two kinds of decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionKind {
    Abort,
    Retry,
}

/// Outcome of evaluating a retry predicate for one attempt
pub enum RetryDecision<T, E> {
    /// Stop retrying
    Abort {
        /// Failure to surface instead of the attempt's own outcome
        failure: Option<ExecutionError<E>>,
    },
    /// Run `next` after `delay`
    Retry { delay: Duration, next: Task<T, E> },
}

impl<T, E> RetryDecision<T, E> {
    /// Shared abort-and-propagate decision
    pub const ABORT: Self = RetryDecision::Abort { failure: None };

    /// Abort and propagate the attempt's own outcome
    pub fn abort() -> Self {
        Self::ABORT
    }

    /// Abort and surface `failure` instead of the attempt's outcome
    pub fn abort_with(failure: ExecutionError<E>) -> Self {
        RetryDecision::Abort {
            failure: Some(failure),
        }
    }

    /// Retry with `next` after `delay`
    pub fn retry(delay: Duration, next: Task<T, E>) -> Self {
        RetryDecision::Retry { delay, next }
    }

    /// Retry with `next` immediately
    pub fn retry_now(next: Task<T, E>) -> Self {
        Self::retry(Duration::ZERO, next)
    }

    /// Build a decision from loose fields, validating them
    ///
    /// `failure` is only meaningful for Abort and is ignored for Retry.
    ///
    /// # Errors
    /// - [`ConfigError::AbortWithDelay`] for an Abort with a non-zero delay
    /// - [`ConfigError::MissingRetryTask`] for a Retry without a task
    pub fn from_parts(
        kind: DecisionKind,
        delay: Duration,
        failure: Option<ExecutionError<E>>,
        next: Option<Task<T, E>>,
    ) -> Result<Self, ConfigError> {
        match kind {
            DecisionKind::Abort if !delay.is_zero() => Err(ConfigError::AbortWithDelay { delay }),
            DecisionKind::Abort => Ok(RetryDecision::Abort { failure }),
            DecisionKind::Retry => match next {
                Some(next) => Ok(RetryDecision::Retry { delay, next }),
                None => Err(ConfigError::MissingRetryTask),
            },
        }
    }

    /// Copy of this decision with `delay` replaced
    ///
    /// Typically used to add jitter to a decision computed elsewhere.
    ///
    /// # Errors
    /// Returns [`ConfigError::AbortWithDelay`] when called on an Abort with a
    /// non-zero delay.
    pub fn with_delay(self, delay: Duration) -> Result<Self, ConfigError> {
        match self {
            RetryDecision::Abort { .. } if !delay.is_zero() => {
                Err(ConfigError::AbortWithDelay { delay })
            }
            RetryDecision::Abort { failure } => Ok(RetryDecision::Abort { failure }),
            RetryDecision::Retry { next, .. } => Ok(RetryDecision::Retry { delay, next }),
        }
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            RetryDecision::Abort { .. } => DecisionKind::Abort,
            RetryDecision::Retry { .. } => DecisionKind::Retry,
        }
    }

    pub fn is_abort(&self) -> bool {
        self.kind() == DecisionKind::Abort
    }

    pub fn is_retry(&self) -> bool {
        self.kind() == DecisionKind::Retry
    }

    /// Delay before the next attempt; always zero for Abort
    pub fn delay(&self) -> Duration {
        match self {
            RetryDecision::Abort { .. } => Duration::ZERO,
            RetryDecision::Retry { delay, .. } => *delay,
        }
    }

    /// Substitute failure of an Abort
    pub fn failure(&self) -> Option<&ExecutionError<E>> {
        match self {
            RetryDecision::Abort { failure } => failure.as_ref(),
            RetryDecision::Retry { .. } => None,
        }
    }

    /// Task to run next for a Retry
    pub fn next_task(&self) -> Option<&Task<T, E>> {
        match self {
            RetryDecision::Abort { .. } => None,
            RetryDecision::Retry { next, .. } => Some(next),
        }
    }

    /// Take the substitute failure of an Abort
    pub fn into_failure(self) -> Option<ExecutionError<E>> {
        match self {
            RetryDecision::Abort { failure } => failure,
            RetryDecision::Retry { .. } => None,
        }
    }
}

// Manual impl: the next task is cloneable whatever `T` is
impl<T, E: Clone> Clone for RetryDecision<T, E> {
    fn clone(&self) -> Self {
        match self {
            RetryDecision::Abort { failure } => RetryDecision::Abort {
                failure: failure.clone(),
            },
            RetryDecision::Retry { delay, next } => RetryDecision::Retry {
                delay: *delay,
                next: next.clone(),
            },
        }
    }
}

impl<T, E: fmt::Debug> fmt::Debug for RetryDecision<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryDecision::Abort { failure } => f
                .debug_struct("Abort")
                .field("failure", failure)
                .finish(),
            RetryDecision::Retry { delay, next } => f
                .debug_struct("Retry")
                .field("delay", delay)
                .field("next", next)
                .finish(),
        }
    }
}
