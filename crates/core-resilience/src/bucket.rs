//! Permit bucket: tick-quantised token accounting
//!
//! Permits accrue lazily. Every query first credits the whole ticks elapsed
//! since the last accrual, then answers. There is no background clock, so an
//! idle bucket costs nothing and there is nothing to shut down.
//!
//! The rate must split one second into whole-millisecond ticks
//! (`1000 % rate_per_second == 0`). With that restriction the tick schedule
//! is exact and never drifts from the nominal rate, however long it runs.
//!
//! The bucket itself is not synchronised. [`RateLimiter`](crate::RateLimiter)
//! owns one behind a mutex and passes in the current instant.
//!
//! # Example
//!
//! ```
//! use steadfast_core_resilience::PermitBucket;
//! use std::time::Duration;
//! use tokio::time::Instant;
//!
//! let start = Instant::now();
//! let mut bucket = PermitBucket::new(10, 10, start).unwrap();
//! assert_eq!(bucket.tick_interval(), Duration::from_millis(100));
//! assert_eq!(bucket.permits_per_tick(), 1.0);
//!
//! // Seeded with one tick's worth of permits
//! assert!(bucket.try_acquire(1, start).is_ok());
//! assert_eq!(bucket.try_acquire(1, start), Err(Duration::from_millis(100)));
//! ```

use crate::error::ConfigError;
use std::time::Duration;
use tokio::time::Instant;

/// Milliseconds in one second; the rate must divide this exactly
pub const MILLIS_PER_SECOND: u32 = 1000;

/// Token bucket with a capacity ceiling and whole-tick accrual
#[derive(Debug, Clone)]
pub struct PermitBucket {
    capacity: u32,
    rate_per_second: u32,
    tick_interval: Duration,
    permits_per_tick: f64,
    /// Always within `[0, capacity]`
    available: f64,
    /// Start of the current, not yet credited, tick
    last_tick: Instant,
}

impl PermitBucket {
    /// Create a bucket, seeded as though one tick had already elapsed
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `capacity` or `rate_per_second` is zero,
    /// or when `1000 % rate_per_second != 0`.
    pub fn new(capacity: u32, rate_per_second: u32, now: Instant) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if rate_per_second == 0 {
            return Err(ConfigError::ZeroRate);
        }
        if MILLIS_PER_SECOND % rate_per_second != 0 {
            return Err(ConfigError::RateNotDivisible {
                rate: rate_per_second,
            });
        }

        let tick_millis = MILLIS_PER_SECOND / rate_per_second;
        let permits_per_tick =
            f64::from(rate_per_second) * f64::from(tick_millis) / f64::from(MILLIS_PER_SECOND);

        Ok(Self {
            capacity,
            rate_per_second,
            tick_interval: Duration::from_millis(u64::from(tick_millis)),
            permits_per_tick,
            available: permits_per_tick.min(f64::from(capacity)),
            last_tick: now,
        })
    }

    /// Maximum number of permits the bucket can hold
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Target sustained admission rate
    pub fn rate_per_second(&self) -> u32 {
        self.rate_per_second
    }

    /// Width of one accrual tick
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Width of one accrual tick in whole milliseconds
    pub fn tick_interval_millis(&self) -> u64 {
        self.tick_interval.as_millis() as u64
    }

    /// Permits credited per elapsed tick
    pub fn permits_per_tick(&self) -> f64 {
        self.permits_per_tick
    }

    /// Permits available at `now`, after accrual
    pub fn available(&mut self, now: Instant) -> f64 {
        self.accrue(now);
        self.available
    }

    /// Take `permits` if they are available at `now`
    ///
    /// On refusal nothing is deducted and the error carries the estimated
    /// wait until enough permits will have accrued.
    pub fn try_acquire(&mut self, permits: u32, now: Instant) -> Result<(), Duration> {
        self.accrue(now);

        let wanted = f64::from(permits);
        if self.available >= wanted {
            self.available -= wanted;
            Ok(())
        } else {
            Err(self.wait_for(wanted, now))
        }
    }

    /// Time until `permits` will be available, zero if they already are
    ///
    /// # Errors
    /// Returns [`ConfigError::PermitsExceedCapacity`] when `permits` exceeds
    /// the capacity; such a request never becomes available.
    pub fn time_until(&mut self, permits: u32, now: Instant) -> Result<Duration, ConfigError> {
        if permits > self.capacity {
            return Err(ConfigError::PermitsExceedCapacity {
                requested: permits,
                capacity: self.capacity,
            });
        }
        self.accrue(now);
        Ok(self.wait_for(f64::from(permits), now))
    }

    /// Credit every whole tick elapsed since `last_tick`
    fn accrue(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let tick_nanos = self.tick_interval.as_nanos();
        let ticks = elapsed.as_nanos() / tick_nanos;
        if ticks == 0 {
            return;
        }

        // Whole ticks only; the partial tick stays pending
        let remainder = Duration::from_nanos((elapsed.as_nanos() % tick_nanos) as u64);
        self.last_tick += elapsed - remainder;

        let credited = self.available + self.permits_per_tick * ticks as f64;
        self.available = credited.min(f64::from(self.capacity));
    }

    /// Wait estimate for `wanted` permits; assumes `accrue(now)` just ran
    fn wait_for(&self, wanted: f64, now: Instant) -> Duration {
        let deficit = wanted - self.available;
        if deficit <= 0.0 {
            return Duration::ZERO;
        }

        let ticks_needed = (deficit / self.permits_per_tick).ceil() as u32;
        let into_tick = now.saturating_duration_since(self.last_tick);
        (self.tick_interval * ticks_needed).saturating_sub(into_tick)
    }
}
