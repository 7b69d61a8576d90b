use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Trait for monotonic clock implementations used by token buckets.
///
/// Implementations must provide monotonic time that never goes backwards.
/// The time is measured as the elapsed [`Duration`] since an arbitrary,
/// per-clock origin. Working with integer durations instead of absolute
/// instants keeps the bucket's tick arithmetic exact.
pub trait Clock {
    /// Returns the time elapsed since this clock's origin.
    ///
    /// The returned value must be monotonic (never decrease).
    fn now(&self) -> Duration;
}

/// Standard clock implementation using [`std::time::Instant`].
///
/// # Examples
///
/// ```rust
/// use tickbucket::{Limit, StdClock, TokenBucket};
/// use std::time::Duration;
///
/// let limit = Limit::new(Duration::from_millis(10), 100);
/// let bucket = TokenBucket::with_clock(limit, StdClock::default()).unwrap();
/// assert_eq!(100, bucket.capacity());
/// ```
#[derive(Clone)]
pub struct StdClock {
    origin: std::time::Instant,
}

impl Default for StdClock {
    fn default() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// High-precision clock implementation using the `quanta` crate.
///
/// Requires the "quanta" feature to be enabled.
#[cfg(feature = "quanta")]
#[derive(Clone)]
pub struct QuantaClock {
    origin: quanta::Instant,
}

#[cfg(feature = "quanta")]
impl Default for QuantaClock {
    fn default() -> Self {
        Self::new(quanta::Clock::new())
    }
}

#[cfg(feature = "quanta")]
impl QuantaClock {
    /// Creates a new `QuantaClock` from a `quanta::Clock` instance.
    pub fn new(clock: quanta::Clock) -> Self {
        let origin = clock.now();
        Self { origin }
    }
}

#[cfg(feature = "quanta")]
impl Clock for QuantaClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Tokio-compatible clock implementation using [`tokio::time::Instant`].
///
/// Follows tokio's paused time in tests, which makes it the natural clock for
/// buckets driven from async code. Requires the "tokio" feature.
#[cfg(feature = "tokio")]
#[derive(Clone)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

#[cfg(feature = "tokio")]
impl Default for TokioClock {
    fn default() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

#[cfg(feature = "tokio")]
impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// High-performance clock using quanta's coarse timing.
///
/// Precision is limited by how frequently quanta's upkeep thread runs. Since
/// the bucket only cares about whole fill intervals, an upkeep period well
/// below the fill interval loses nothing.
///
/// Requires the "quanta" feature to be enabled.
#[cfg(feature = "quanta")]
#[derive(Clone)]
pub struct FastClock {
    clock: quanta::Clock,
    origin: quanta::Instant,
}

#[cfg(feature = "quanta")]
impl Default for FastClock {
    fn default() -> Self {
        Self::new(quanta::Clock::new())
    }
}

#[cfg(feature = "quanta")]
impl FastClock {
    /// Creates a new `FastClock` from a `quanta::Clock` instance.
    ///
    /// **Important**: Ensure the clock's upkeep thread is running, otherwise
    /// the token bucket will not observe clock changes and will never refill.
    pub fn new(clock: quanta::Clock) -> Self {
        let origin = clock.recent();
        Self { clock, origin }
    }
}

#[cfg(feature = "quanta")]
impl Clock for FastClock {
    fn now(&self) -> Duration {
        self.clock.recent().saturating_duration_since(self.origin)
    }
}

/// Manual clock implementation for testing and simulation.
///
/// Allows precise control over time progression, making it ideal for unit tests
/// and deterministic simulations of rate limiting behavior. The clock is
/// thread-safe and can be shared by reference or through an [`Arc`].
///
/// # Examples
///
/// ```rust
/// use tickbucket::{Limit, ManualClock, TokenBucket};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let limit = Limit::new(Duration::from_secs(1), 10).with_initial_tokens(0);
/// let clock = Arc::new(ManualClock::default());
/// let bucket = TokenBucket::with_clock(limit, Arc::clone(&clock)).unwrap();
///
/// assert_eq!(0, bucket.take_available(1));
///
/// clock.advance(Duration::from_secs(1));
/// assert_eq!(1, bucket.take_available(1));
/// ```
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    /// Creates a new manual clock reading `now`.
    pub fn new(now: Duration) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Sets the current time to the specified value.
    pub fn set(&self, now: Duration) {
        *self.now.lock() = now;
    }

    /// Advances the current time by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.lock();
        *guard = guard.saturating_add(delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

impl Clock for &ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

impl Clock for Arc<ManualClock> {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(Duration::from_millis(5));
        assert_eq!(Duration::from_millis(5), clock.now());
        clock.advance(Duration::from_millis(10));
        assert_eq!(Duration::from_millis(15), clock.now());
        clock.set(Duration::from_secs(2));
        assert_eq!(Duration::from_secs(2), (&clock).now());
    }

    #[test]
    fn manual_clock_advance_saturates() {
        let clock = ManualClock::new(Duration::MAX);
        clock.advance(Duration::from_secs(1));
        assert_eq!(Duration::MAX, clock.now());
    }

    #[test]
    fn std_clock_is_monotonic() {
        let clock = StdClock::default();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
