//! Re-invokable unit of work
//!
//! A [`Task`] wraps a closure that produces a fresh future on every call.
//! Retrying means calling it again, so the closure must be safe to run more
//! than once. That is the caller's contract; the engine cannot check it.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type TaskFn<T, E> = dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync;

/// A cheaply cloneable handle to an async unit of work
///
/// # Example
/// ```
/// use steadfast_core_resilience::Task;
///
/// # #[tokio::main]
/// # async fn main() {
/// let task: Task<u32, std::io::Error> = Task::new(|| async { Ok(7) });
/// assert_eq!(task.call().await.unwrap(), 7);
/// // Clones share the same closure
/// assert!(task.clone().ptr_eq(&task));
/// # }
/// ```
pub struct Task<T, E> {
    inner: Arc<TaskFn<T, E>>,
}

impl<T, E> Task<T, E>
where
    T: 'static,
    E: 'static,
{
    /// Wrap a closure returning a future
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let inner: Arc<TaskFn<T, E>> =
            Arc::new(move || -> BoxFuture<'static, Result<T, E>> { Box::pin(f()) });
        Self { inner }
    }
}

impl<T, E> Task<T, E> {
    /// Start one invocation of the task
    pub fn call(&self) -> BoxFuture<'static, Result<T, E>> {
        (self.inner)()
    }

    /// Whether two handles point at the same closure
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T, E> Clone for Task<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("inner", &Arc::as_ptr(&self.inner))
            .finish()
    }
}
