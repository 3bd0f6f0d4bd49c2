//! Rate limiting for preventing service overload
//!
//! A [`RateLimiter`] owns one [`PermitBucket`] behind a mutex. The whole
//! "measure elapsed, accrue, compare, deduct" sequence runs inside that one
//! critical section, so concurrent callers are totally ordered and can never
//! overdraw the bucket. The critical section is O(1) and never awaits.
//!
//! When no permit is available, [`RateLimiter::execute`] hands the task to
//! the configured [`RejectedExecutionHandler`]. The default handler
//! ([`FailFast`]) returns [`ExecutionError::Rejected`] immediately.

use crate::bucket::PermitBucket;
use crate::error::{ConfigError, ExecutionError};
use crate::rejection::{FailFast, RejectedExecutionHandler};
use crate::task::Task;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Result of an admission check
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// A permit was taken; the caller may proceed
    Granted,
    /// Not enough permits; `wait` estimates when they will have accrued
    Rejected { wait: Duration },
    /// The limiter is closed and will never grant again
    Closed,
}

impl Admission {
    /// Whether the admission was granted
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted)
    }
}

/// Mutable state guarded by the limiter's lock
#[derive(Debug)]
struct LimiterState {
    bucket: PermitBucket,
    closed: bool,
}

/// Rate limiter using a tick-quantised permit bucket
///
/// Share it across tasks with an `Arc`. Dropping the last handle releases
/// everything; there is no background clock.
///
/// # Example
/// ```no_run
/// use steadfast_core_resilience::{ExecutionError, RateLimiter, Task};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Burst of 10, sustained 10 per second
///     let limiter: RateLimiter<u32, std::io::Error> = RateLimiter::new(10, 10)?;
///
///     let value = limiter.execute(Task::new(|| async { Ok(42) })).await?;
///     assert_eq!(value, 42);
///
///     // The seeded permit is gone and 100 ms have not elapsed yet
///     let err = limiter.execute(Task::new(|| async { Ok(43) })).await.unwrap_err();
///     assert!(matches!(err, ExecutionError::Rejected { .. }));
///
///     limiter.close();
///     Ok(())
/// }
/// ```
pub struct RateLimiter<T, E> {
    state: Mutex<LimiterState>,
    handler: Arc<dyn RejectedExecutionHandler<T, E>>,
    capacity: u32,
    rate_per_second: u32,
    tick_interval: Duration,
    permits_per_tick: f64,
}

impl<T, E> RateLimiter<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a rate limiter with the fail-fast rejection handler
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of permits that can accumulate (burst)
    /// * `rate_per_second` - Sustained admission rate; must divide 1000
    ///
    /// # Errors
    /// Returns [`ConfigError`] for a zero capacity or rate, or a rate that
    /// does not split one second into whole-millisecond ticks.
    ///
    /// # Example
    /// ```
    /// use steadfast_core_resilience::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiter::<(), ()>::new(10, 10).unwrap();
    /// assert_eq!(limiter.tick_interval(), Duration::from_millis(100));
    ///
    /// assert!(RateLimiter::<(), ()>::new(1000, 9).is_err());
    /// ```
    pub fn new(capacity: u32, rate_per_second: u32) -> Result<Self, ConfigError> {
        let bucket = PermitBucket::new(capacity, rate_per_second, Instant::now())?;

        Ok(Self {
            capacity: bucket.capacity(),
            rate_per_second: bucket.rate_per_second(),
            tick_interval: bucket.tick_interval(),
            permits_per_tick: bucket.permits_per_tick(),
            state: Mutex::new(LimiterState {
                bucket,
                closed: false,
            }),
            handler: Arc::new(FailFast),
        })
    }

    /// Replace the rejection handler
    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: RejectedExecutionHandler<T, E> + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// Replace the rejection handler with a shared one
    pub fn with_shared_handler(mut self, handler: Arc<dyn RejectedExecutionHandler<T, E>>) -> Self {
        self.handler = handler;
        self
    }

    /// Execute a task if a permit is available, otherwise delegate to the
    /// rejection handler
    ///
    /// A granted task runs inline in the caller's future and its result is
    /// returned unchanged (task failures arrive as [`ExecutionError::Task`]).
    pub async fn execute(&self, task: Task<T, E>) -> Result<T, ExecutionError<E>> {
        match self.try_acquire() {
            Admission::Granted => self.run(&task).await,
            Admission::Closed => Err(ExecutionError::Closed),
            Admission::Rejected { wait } => {
                debug!(
                    wait_ms = wait.as_millis() as u64,
                    "rate limit hit, delegating to rejection handler"
                );
                self.handler.reject(self, task, wait).await
            }
        }
    }

    /// Execute a task only if a permit is available right now
    ///
    /// Never consults the rejection handler. Handlers use this to re-try
    /// admission without recursing into themselves.
    pub async fn try_execute(&self, task: &Task<T, E>) -> Result<T, ExecutionError<E>> {
        match self.try_acquire() {
            Admission::Granted => self.run(task).await,
            Admission::Closed => Err(ExecutionError::Closed),
            Admission::Rejected { wait } => Err(ExecutionError::Rejected { wait }),
        }
    }

    async fn run(&self, task: &Task<T, E>) -> Result<T, ExecutionError<E>> {
        let result = task.call().await.map_err(ExecutionError::Task);
        if result.is_ok() {
            debug!("task executed under rate limit");
        }
        result
    }
}

impl<T, E> RateLimiter<T, E> {
    /// Take one permit without waiting
    pub fn try_acquire(&self) -> Admission {
        self.admit(1)
    }

    /// Take `permits` permits without waiting
    ///
    /// # Errors
    /// Returns [`ConfigError::PermitsExceedCapacity`] when `permits` could
    /// never be granted because it exceeds the bucket's capacity.
    pub fn try_acquire_many(&self, permits: u32) -> Result<Admission, ConfigError> {
        self.check_request(permits)?;
        Ok(self.admit(permits))
    }

    /// Take `permits` permits, waiting up to `timeout` for them to accrue
    ///
    /// Gives up early, without sleeping, once the wait estimate shows the
    /// permits cannot accrue before the timeout expires.
    ///
    /// # Errors
    /// Returns [`ConfigError::PermitsExceedCapacity`] when `permits` exceeds
    /// the bucket's capacity.
    pub async fn acquire_timeout(
        &self,
        permits: u32,
        timeout: Duration,
    ) -> Result<Admission, ConfigError> {
        self.check_request(permits)?;
        let deadline = Instant::now() + timeout;

        loop {
            match self.admit(permits) {
                Admission::Rejected { wait } if Instant::now() + wait <= deadline => {
                    tokio::time::sleep(wait).await;
                }
                outcome => return Ok(outcome),
            }
        }
    }

    /// Permits available right now, after accrual
    pub fn available_permits(&self) -> f64 {
        self.lock().bucket.available(Instant::now())
    }

    /// Time until `permits` will be available, zero if they already are
    ///
    /// # Errors
    /// Returns [`ConfigError::PermitsExceedCapacity`] when `permits` exceeds
    /// the bucket's capacity.
    pub fn time_until_available(&self, permits: u32) -> Result<Duration, ConfigError> {
        self.check_request(permits)?;
        self.lock().bucket.time_until(permits, Instant::now())
    }

    /// Close the limiter; every later admission attempt sees `Closed`
    ///
    /// A call already inside its critical section when this runs completes
    /// normally. Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            info!(
                capacity = self.capacity,
                rate_per_second = self.rate_per_second,
                "rate limiter closed"
            );
        }
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Maximum number of permits that can accumulate
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Sustained admission rate
    pub fn rate_per_second(&self) -> u32 {
        self.rate_per_second
    }

    /// Interval at which permits are replenished
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Permits credited per replenish interval
    pub fn permits_per_tick(&self) -> f64 {
        self.permits_per_tick
    }

    fn admit(&self, permits: u32) -> Admission {
        let mut state = self.lock();
        if state.closed {
            return Admission::Closed;
        }
        match state.bucket.try_acquire(permits, Instant::now()) {
            Ok(()) => Admission::Granted,
            Err(wait) => Admission::Rejected { wait },
        }
    }

    fn check_request(&self, permits: u32) -> Result<(), ConfigError> {
        if permits > self.capacity {
            return Err(ConfigError::PermitsExceedCapacity {
                requested: permits,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        // Every update leaves the state consistent, so a poisoned lock is safe to reuse
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T, E> fmt::Debug for RateLimiter<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("capacity", &self.capacity)
            .field("rate_per_second", &self.rate_per_second)
            .field("tick_interval", &self.tick_interval)
            .field("permits_per_tick", &self.permits_per_tick)
            .finish_non_exhaustive()
    }
}
