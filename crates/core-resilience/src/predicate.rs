//! Retry predicates
//!
//! The engine owns no retry policy. Callers plug one in by implementing
//! [`RetryPredicate`]; the [`ResilientExecutor`](crate::ResilientExecutor)
//! consults it after every attempt and follows the returned
//! [`RetryDecision`].
//!
//! Attempt numbers are 1-based: the first call of a task is attempt 1.
//! A predicate that never aborts retries forever; bounding is the
//! predicate's job, for example through [`AttemptLimit`].

use crate::decision::RetryDecision;
use crate::error::ExecutionError;
use crate::task::Task;
use std::fmt;
use tracing::debug;

/// Policy consulted after each attempt
pub trait RetryPredicate<T, E>: Send + Sync {
    /// Decide what to do after attempt `attempt` of `task` failed
    fn on_failure(
        &self,
        attempt: u32,
        failure: &ExecutionError<E>,
        task: &Task<T, E>,
    ) -> RetryDecision<T, E>;

    /// Decide what to do after attempt `attempt` of `task` produced `value`
    ///
    /// Abort (the default) accepts the value. Retry discards it and runs the
    /// replacement task; an Abort carrying a failure surfaces that failure
    /// instead.
    fn on_result(&self, _attempt: u32, _value: &T, _task: &Task<T, E>) -> RetryDecision<T, E> {
        RetryDecision::abort()
    }
}

/// Adapts a closure into a [`RetryPredicate`] that only looks at failures
///
/// Build one with [`retry_fn`].
#[derive(Clone)]
pub struct FnPredicate<F> {
    f: F,
}

/// Use a closure as the failure hook of a retry predicate
///
/// # Example
/// ```
/// use steadfast_core_resilience::{retry_fn, ExecutionError, RetryDecision, Task};
/// use std::time::Duration;
///
/// // Retry rejections after the limiter's own wait hint, abort everything else
/// let predicate = retry_fn(|_attempt, failure: &ExecutionError<std::io::Error>, task: &Task<u32, _>| {
///     match failure.wait_hint() {
///         Some(wait) => RetryDecision::retry(wait, task.clone()),
///         None => RetryDecision::abort(),
///     }
/// });
/// # let _ = predicate;
/// ```
pub fn retry_fn<T, E, F>(f: F) -> FnPredicate<F>
where
    F: Fn(u32, &ExecutionError<E>, &Task<T, E>) -> RetryDecision<T, E> + Send + Sync,
{
    FnPredicate { f }
}

impl<T, E, F> RetryPredicate<T, E> for FnPredicate<F>
where
    F: Fn(u32, &ExecutionError<E>, &Task<T, E>) -> RetryDecision<T, E> + Send + Sync,
{
    fn on_failure(
        &self,
        attempt: u32,
        failure: &ExecutionError<E>,
        task: &Task<T, E>,
    ) -> RetryDecision<T, E> {
        (self.f)(attempt, failure, task)
    }
}

impl<F> fmt::Debug for FnPredicate<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPredicate").finish_non_exhaustive()
    }
}

/// Caps another predicate at a fixed number of attempts
///
/// Once `max_attempts` attempts have run, every Retry from the inner
/// predicate is turned into an Abort that propagates the last outcome.
#[derive(Debug, Clone)]
pub struct AttemptLimit<P> {
    inner: P,
    max_attempts: u32,
}

impl<P> AttemptLimit<P> {
    /// Allow at most `max_attempts` attempts in total (including the first)
    pub fn new(inner: P, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn cap<T, E>(&self, attempt: u32, decision: RetryDecision<T, E>) -> RetryDecision<T, E> {
        if decision.is_retry() && attempt >= self.max_attempts {
            debug!(
                attempt,
                max_attempts = self.max_attempts,
                "attempt limit reached"
            );
            return RetryDecision::abort();
        }
        decision
    }
}

impl<T, E, P> RetryPredicate<T, E> for AttemptLimit<P>
where
    P: RetryPredicate<T, E>,
{
    fn on_failure(
        &self,
        attempt: u32,
        failure: &ExecutionError<E>,
        task: &Task<T, E>,
    ) -> RetryDecision<T, E> {
        self.cap(attempt, self.inner.on_failure(attempt, failure, task))
    }

    fn on_result(&self, attempt: u32, value: &T, task: &Task<T, E>) -> RetryDecision<T, E> {
        self.cap(attempt, self.inner.on_result(attempt, value, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn task() -> Task<u32, &'static str> {
        Task::new(|| async { Err("boom") })
    }

    fn always_retry() -> impl RetryPredicate<u32, &'static str> {
        retry_fn(|_, _: &ExecutionError<&'static str>, task: &Task<u32, &'static str>| {
            RetryDecision::retry(Duration::from_millis(10), task.clone())
        })
    }

    #[test]
    fn test_fn_predicate_sees_attempt_and_failure() {
        let predicate = retry_fn(
            |attempt, failure: &ExecutionError<&'static str>, task: &Task<u32, &'static str>| {
                if attempt < 3 && failure.is_task() {
                    RetryDecision::retry_now(task.clone())
                } else {
                    RetryDecision::abort()
                }
            },
        );
        let t = task();
        let failure = ExecutionError::Task("boom");

        assert!(predicate.on_failure(1, &failure, &t).is_retry());
        assert!(predicate.on_failure(3, &failure, &t).is_abort());
        assert!(predicate
            .on_failure(1, &ExecutionError::Closed, &t)
            .is_abort());
    }

    #[test]
    fn test_default_result_hook_accepts_value() {
        let predicate = always_retry();
        assert!(predicate.on_result(1, &5, &task()).is_abort());
    }

    #[test]
    fn test_attempt_limit_caps_retries() {
        let limited = AttemptLimit::new(always_retry(), 3);
        let t = task();
        let failure = ExecutionError::Task("boom");

        assert!(limited.on_failure(1, &failure, &t).is_retry());
        assert!(limited.on_failure(2, &failure, &t).is_retry());
        let last = limited.on_failure(3, &failure, &t);
        assert!(last.is_abort());
        assert!(last.failure().is_none());
    }

    #[test]
    fn test_attempt_limit_passes_aborts_through() {
        let substitute = retry_fn(|_, _: &ExecutionError<&'static str>, _: &Task<u32, _>| {
            RetryDecision::abort_with(ExecutionError::Task("substitute"))
        });
        let limited = AttemptLimit::new(substitute, 10);
        let decision = limited.on_failure(1, &ExecutionError::Task("boom"), &task());
        assert_eq!(
            decision.into_failure().and_then(|f| f.into_task_error()),
            Some("substitute")
        );
    }
}
