use std::time::Duration;

use likely_stable::{likely, unlikely};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{BucketError, WaitRefused};
use crate::{Clock, Limit, StdClock};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// The only mutable part of a bucket.
#[derive(Debug)]
struct State {
    /// Tokens available as of `latest_tick`. Negative while callers owe
    /// tokens that were promised ahead of replenishment.
    available: i64,
    /// Number of whole fill intervals already credited to `available`.
    latest_tick: u64,
}

/// A token bucket that fills with `quantum` tokens every `fill_interval`, up
/// to `capacity` tokens.
///
/// Tokens are never added by a background task. Every operation first credits
/// the whole fill intervals that elapsed since the last one, then acts on the
/// result, all under a single lock.
///
/// Takes that cannot be satisfied right away are still committed: the bucket
/// goes into debt and the caller is told how long to wait until the tokens it
/// was promised have arrived. Later callers see that debt, so concurrent
/// callers are handed increasing waits in the order they acquired the lock.
/// Bounded variants refuse instead, without touching the bucket.
///
/// # Examples
///
/// ```rust
/// use tickbucket::{Limit, ManualClock, TokenBucket};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::default());
/// let limit = Limit::new(Duration::from_millis(250), 10);
/// let bucket = TokenBucket::with_clock(limit, Arc::clone(&clock)).unwrap();
///
/// assert_eq!(Duration::ZERO, bucket.take(10));
/// // the next two tokens arrive after two fill intervals
/// assert_eq!(Duration::from_millis(500), bucket.take(2));
/// assert_eq!(-2, bucket.available());
/// ```
pub struct TokenBucket<C = StdClock> {
    clock: C,
    /// Clock reading at construction; all ticks count from here.
    start: Duration,
    limit: Limit,
    fill_nanos: u128,
    state: Mutex<State>,
}

impl<C> std::fmt::Debug for TokenBucket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBucket")
            .field("limit", &self.limit)
            .field("start", &self.start)
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl TokenBucket<StdClock> {
    /// Creates a new token bucket driven by the standard monotonic clock.
    ///
    /// # Errors
    ///
    /// [`BucketError::InvalidFillInterval`] if the fill interval is zero and
    /// [`BucketError::InvalidCapacity`] if the capacity is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tickbucket::{Limit, TokenBucket};
    /// use std::num::NonZeroU64;
    ///
    /// let bucket = TokenBucket::new(Limit::per_second(NonZeroU64::new(100).unwrap())).unwrap();
    /// assert_eq!(100, bucket.capacity());
    /// ```
    pub fn new(limit: Limit) -> Result<Self, BucketError> {
        Self::with_clock(limit, StdClock::default())
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Creates a new token bucket with a custom clock implementation.
    ///
    /// The clock is read once here; that reading is the bucket's start time.
    /// Use [`ManualClock`](crate::ManualClock) for deterministic tests.
    ///
    /// # Errors
    ///
    /// Same as [`TokenBucket::new`].
    pub fn with_clock(limit: Limit, clock: C) -> Result<Self, BucketError> {
        if limit.fill_interval.is_zero() {
            return Err(BucketError::InvalidFillInterval);
        }
        if limit.capacity == 0 || limit.capacity > i64::MAX as u64 {
            return Err(BucketError::InvalidCapacity);
        }
        let initial = limit.initial_tokens().min(limit.capacity);
        let limit = Limit {
            quantum: limit.quantum(),
            initial_tokens: Some(initial),
            ..limit
        };
        debug!(
            fill_interval = ?limit.fill_interval,
            capacity = limit.capacity,
            quantum = limit.quantum,
            initial,
            "created token bucket"
        );
        let start = clock.now();
        Ok(Self {
            clock,
            start,
            fill_nanos: limit.fill_interval.as_nanos(),
            limit,
            state: Mutex::new(State {
                available: initial as i64,
                latest_tick: 0,
            }),
        })
    }

    /// Takes `count` tokens, sleeping the current thread until they are
    /// available.
    ///
    /// The tokens are committed before sleeping and the bucket is not locked
    /// while this thread sleeps.
    pub fn wait(&self, count: u64) {
        let wait = self.take(count);
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    /// Like [`wait`](Self::wait), but only if the tokens become available
    /// within `max_wait`.
    ///
    /// # Errors
    ///
    /// [`WaitRefused`] without sleeping and without taking anything if the
    /// required wait exceeds `max_wait`.
    pub fn wait_max_duration(&self, count: u64, max_wait: Duration) -> Result<(), WaitRefused> {
        let wait = self.take_max_duration(count, max_wait)?;
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
        Ok(())
    }

    /// Takes `count` tokens and returns how long the caller must wait before
    /// the tokens may be used. Never sleeps and never refuses.
    ///
    /// `count` may exceed the capacity; the wait grows accordingly.
    ///
    /// ```rust
    /// use tickbucket::{Limit, ManualClock, TokenBucket};
    /// use std::time::Duration;
    ///
    /// let clock = ManualClock::default();
    /// let limit = Limit::new(Duration::from_millis(1), 10);
    /// let bucket = TokenBucket::with_clock(limit, &clock).unwrap();
    /// assert_eq!(Duration::from_millis(15), bucket.take(25));
    /// ```
    pub fn take(&self, count: u64) -> Duration {
        match self.take_at(self.clock.now(), count, None) {
            Ok(wait) => wait,
            // unbounded takes are never refused
            Err(refused) => refused.required,
        }
    }

    /// Takes `count` tokens if they will be available within `max_wait`,
    /// returning the wait until then.
    ///
    /// # Errors
    ///
    /// [`WaitRefused`] if the required wait exceeds `max_wait`. The bucket is
    /// not modified in that case.
    ///
    /// ```rust
    /// use tickbucket::{Limit, ManualClock, TokenBucket};
    /// use std::time::Duration;
    ///
    /// let clock = ManualClock::default();
    /// let limit = Limit::new(Duration::from_millis(100), 1);
    /// let bucket = TokenBucket::with_clock(limit, &clock).unwrap();
    /// assert_eq!(Ok(Duration::ZERO), bucket.take_max_duration(1, Duration::ZERO));
    ///
    /// let refused = bucket.take_max_duration(1, Duration::from_millis(50)).unwrap_err();
    /// assert_eq!(Duration::from_millis(100), refused.required_wait());
    /// assert_eq!(0, bucket.available());
    /// ```
    pub fn take_max_duration(&self, count: u64, max_wait: Duration) -> Result<Duration, WaitRefused> {
        self.take_at(self.clock.now(), count, Some(max_wait))
    }

    /// Takes up to `count` tokens that are available right now and returns
    /// how many were taken. Never waits, never goes into debt.
    pub fn take_available(&self, count: u64) -> u64 {
        self.take_available_at(self.clock.now(), count)
    }

    /// Returns the number of tokens available right now.
    ///
    /// Negative while the bucket is in debt. Credits elapsed fill intervals
    /// but never consumes tokens.
    pub fn available(&self) -> i64 {
        self.available_at(self.clock.now())
    }

    /// Maximum number of tokens the bucket holds.
    pub fn capacity(&self) -> u64 {
        self.limit.capacity
    }

    /// Fill rate in tokens per second.
    pub fn rate(&self) -> f64 {
        self.limit.rate_per_second()
    }

    pub fn fill_interval(&self) -> Duration {
        self.limit.fill_interval
    }

    pub fn quantum(&self) -> u64 {
        self.limit.quantum
    }

    /// The validated configuration of this bucket, with the initial tokens
    /// already clamped to the capacity.
    pub fn limit(&self) -> &Limit {
        &self.limit
    }

    pub(crate) fn take_at(
        &self,
        now: Duration,
        count: u64,
        max_wait: Option<Duration>,
    ) -> Result<Duration, WaitRefused> {
        if count == 0 {
            return Ok(Duration::ZERO);
        }
        let mut state = self.state.lock();
        self.adjust_available(&mut state, now);

        let remaining = state.available as i128 - count as i128;
        if likely(remaining >= 0) {
            state.available = remaining as i64;
            return Ok(Duration::ZERO);
        }

        let wait = self.wait_for_debt(&state, now, remaining.unsigned_abs());
        if let Some(max_wait) = max_wait {
            if unlikely(wait > max_wait) {
                debug!(count, required = ?wait, ?max_wait, "refused take");
                return Err(WaitRefused {
                    required: wait,
                    max_wait,
                });
            }
        }
        state.available = remaining.max(i64::MIN as i128) as i64;
        trace!(count, ?wait, available = state.available, "took tokens on credit");
        Ok(wait)
    }

    pub(crate) fn take_available_at(&self, now: Duration, count: u64) -> u64 {
        if count == 0 {
            return 0;
        }
        let mut state = self.state.lock();
        self.adjust_available(&mut state, now);
        if state.available <= 0 {
            return 0;
        }
        let taken = count.min(state.available as u64);
        state.available -= taken as i64;
        taken
    }

    pub(crate) fn available_at(&self, now: Duration) -> i64 {
        let mut state = self.state.lock();
        self.adjust_available(&mut state, now);
        state.available
    }

    /// Credits the fill intervals elapsed up to `now` that were not credited
    /// yet. A reading older than the latest credited tick changes nothing.
    fn adjust_available(&self, state: &mut State, now: Duration) {
        let tick = self.current_tick(now);
        if tick <= state.latest_tick {
            return;
        }
        let added = ((tick - state.latest_tick) as i128).saturating_mul(self.limit.quantum as i128);
        state.available = (state.available as i128)
            .saturating_add(added)
            .min(self.limit.capacity as i128) as i64;
        state.latest_tick = tick;
    }

    fn current_tick(&self, now: Duration) -> u64 {
        let ticks = self.elapsed(now).as_nanos() / self.fill_nanos;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.start)
    }

    /// Time from `now` until enough whole quanta arrive to pay off `debt`
    /// tokens beyond what is available at the latest credited tick.
    fn wait_for_debt(&self, state: &State, now: Duration, debt: u128) -> Duration {
        let ticks = debt.div_ceil(self.limit.quantum as u128);
        let end_tick = (state.latest_tick as u128).saturating_add(ticks);
        let end_nanos = end_tick.saturating_mul(self.fill_nanos);
        duration_from_nanos(end_nanos.saturating_sub(self.elapsed(now).as_nanos()))
    }
}

fn duration_from_nanos(nanos: u128) -> Duration {
    let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
    Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
}
