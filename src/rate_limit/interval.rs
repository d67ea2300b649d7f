//! Minimum-interval rate limiting.
//!
//! A single timestamp of the last admitted call is shared by every caller.
//! A call is admitted once `min_interval` has passed since that timestamp;
//! denied callers get the remaining wait and no reservation.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use universalis_price_cache::rate_limit::RateLimiter;
//!
//! let limiter = RateLimiter::new(Duration::from_secs(5));
//! let t0 = Instant::now();
//!
//! assert!(limiter.try_acquire(t0).is_ok());
//! assert_eq!(
//!     limiter.try_acquire(t0 + Duration::from_secs(2)),
//!     Err(Duration::from_secs(3))
//! );
//! assert!(limiter.try_acquire(t0 + Duration::from_secs(5)).is_ok());
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Global gate enforcing a minimum spacing between outbound calls.
#[derive(Debug)]
pub struct RateLimiter {
    /// `None` until the first admitted call
    last_acquire: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a limiter that has never admitted a call.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_acquire: Mutex::new(None),
            min_interval,
        }
    }

    /// Try to admit a call at `now`.
    ///
    /// Returns `Ok(())` and records `now` if the interval has passed, or
    /// `Err(wait_time)` with the time left otherwise. Check and update happen
    /// under one lock, so of several callers racing past the boundary exactly
    /// one is admitted.
    pub fn try_acquire(&self, now: Instant) -> Result<(), Duration> {
        let mut last = self.lock();
        match Self::wait_from(*last, now, self.min_interval) {
            Some(wait_time) => Err(wait_time),
            None => {
                *last = Some(now);
                Ok(())
            }
        }
    }

    /// Get the time until the next call would be admitted.
    ///
    /// Returns `None` if a call would be admitted at `now`.
    pub fn time_until_available(&self, now: Instant) -> Option<Duration> {
        Self::wait_from(*self.lock(), now, self.min_interval)
    }

    /// Check if a call would be admitted without consuming the slot.
    pub fn would_allow(&self, now: Instant) -> bool {
        self.time_until_available(now).is_none()
    }

    /// Instant of the last admitted call.
    pub fn last_acquired(&self) -> Option<Instant> {
        *self.lock()
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Forget the last admitted call.
    pub fn reset(&self) {
        *self.lock() = None;
    }

    fn wait_from(last: Option<Instant>, now: Instant, min_interval: Duration) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(last?);
        (elapsed < min_interval).then(|| min_interval - elapsed)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Instant>> {
        self.last_acquire.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(super::limits::MIN_CALL_INTERVAL_SECS))
    }
}
