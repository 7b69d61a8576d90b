use std::num::NonZeroU64;
use std::time::Duration;

use crate::BucketError;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;
const MILLIS_PER_SECOND: f64 = 1000.0;

/// Fill intervals derived from a rate are whole multiples of this step.
const MIN_FILL_INTERVAL: Duration = Duration::from_millis(1);
/// Largest relative difference tolerated between the requested and the
/// realised rate when deriving a fill interval and quantum.
const RATE_MARGIN: f64 = 0.01;
/// Upper bound on the fill intervals tried for one rate.
const MAX_DERIVATION_STEPS: u64 = 100_000;

/// Configuration of a token bucket.
///
/// Every `fill_interval` the bucket gains `quantum` tokens, up to `capacity`.
/// A `Limit` is plain data; it is validated when a
/// [`TokenBucket`](crate::TokenBucket) is built from it.
///
/// # Examples
///
/// ```rust
/// use tickbucket::Limit;
/// use std::num::NonZeroU64;
/// use std::time::Duration;
///
/// // 5 tokens every 100ms (50 per second), burst of 200, starting empty
/// let limit = Limit::new(Duration::from_millis(100), 200)
///     .with_quantum(5)
///     .with_initial_tokens(0);
/// assert_eq!(50.0, limit.rate_per_second());
///
/// // 10k tokens per second, one second of burst
/// let limit = Limit::per_second(NonZeroU64::new(10_000).unwrap());
/// assert_eq!(Duration::from_millis(1), limit.fill_interval());
/// assert_eq!(10, limit.quantum());
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub(crate) fill_interval: Duration,
    pub(crate) capacity: u64,
    pub(crate) quantum: u64,
    pub(crate) initial_tokens: Option<u64>,
}

impl std::fmt::Debug for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Limit(fill_interval={:?}, quantum={}, capacity={}, rate_per_second={})",
            self.fill_interval,
            self.quantum,
            self.capacity,
            self.rate_per_second()
        )
    }
}

impl Limit {
    /// One token every `fill_interval`, holding at most `capacity` tokens.
    ///
    /// The bucket starts full unless [`with_initial_tokens`](Self::with_initial_tokens)
    /// says otherwise.
    pub const fn new(fill_interval: Duration, capacity: u64) -> Self {
        Self {
            fill_interval,
            capacity,
            quantum: 1,
            initial_tokens: None,
        }
    }

    /// Creates a limit of `rate` tokens per second.
    ///
    /// The fill interval is the smallest whole number of milliseconds for
    /// which `quantum = round(rate * fill_interval)` is at least one and the
    /// realised rate stays within 1% of `rate`. Burst capacity equals the
    /// rate, so one second worth of tokens is available immediately.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tickbucket::Limit;
    /// use std::num::NonZeroU64;
    /// use std::time::Duration;
    ///
    /// let limit = Limit::per_second(NonZeroU64::new(10_061).unwrap());
    /// assert_eq!(10_061, limit.capacity());
    /// assert_eq!(Duration::from_millis(1), limit.fill_interval());
    /// assert_eq!(10, limit.quantum());
    /// ```
    pub fn per_second(rate: NonZeroU64) -> Self {
        let (fill_interval, quantum) = derive_fill_interval(rate.get() as f64)
            .unwrap_or((Duration::from_secs(1), rate.get()));
        Self {
            fill_interval,
            capacity: rate.get(),
            quantum,
            initial_tokens: None,
        }
    }

    /// Creates a limit of `rate` tokens per minute.
    ///
    /// Burst capacity is one second worth of tokens, but never less than one.
    ///
    /// ```rust
    /// use tickbucket::Limit;
    /// use std::num::NonZeroU64;
    /// use std::time::Duration;
    ///
    /// let limit = Limit::per_minute(NonZeroU64::new(600).unwrap());
    /// assert_eq!(Duration::from_millis(100), limit.fill_interval());
    /// assert_eq!(10, limit.capacity());
    /// ```
    pub fn per_minute(rate: NonZeroU64) -> Self {
        Self::per_period(rate, SECONDS_PER_MINUTE)
    }

    /// Creates a limit of `rate` tokens per hour.
    ///
    /// Burst capacity is one second worth of tokens, but never less than one.
    pub fn per_hour(rate: NonZeroU64) -> Self {
        Self::per_period(rate, SECONDS_PER_HOUR)
    }

    fn per_period(rate: NonZeroU64, period_secs: u64) -> Self {
        let per_second = rate.get() as f64 / period_secs as f64;
        let (fill_interval, quantum) = derive_fill_interval(per_second)
            .unwrap_or((Duration::from_secs(period_secs), rate.get()));
        Self {
            fill_interval,
            capacity: rate.get().div_ceil(period_secs),
            quantum,
            initial_tokens: None,
        }
    }

    /// Creates a limit from a fractional tokens-per-second `rate` with the
    /// given burst `capacity`.
    ///
    /// Fails with [`BucketError::InvalidRate`] when `rate` is not a positive
    /// finite number or no fill interval can represent it.
    ///
    /// ```rust
    /// use tickbucket::Limit;
    /// use std::time::Duration;
    ///
    /// let limit = Limit::with_rate(0.5, 1).unwrap();
    /// assert_eq!(Duration::from_millis(1981), limit.fill_interval());
    /// assert!(Limit::with_rate(f64::NAN, 1).is_err());
    /// ```
    pub fn with_rate(rate: f64, capacity: u64) -> Result<Self, BucketError> {
        let (fill_interval, quantum) =
            derive_fill_interval(rate).ok_or(BucketError::InvalidRate(rate))?;
        Ok(Self {
            fill_interval,
            capacity,
            quantum,
            initial_tokens: None,
        })
    }

    /// Sets the number of tokens added every fill interval.
    ///
    /// Zero means unset and is treated as one.
    pub const fn with_quantum(mut self, quantum: u64) -> Self {
        self.quantum = quantum;
        self
    }

    /// Sets the burst capacity.
    pub const fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the number of tokens the bucket starts with.
    ///
    /// Values above the capacity are clamped to it.
    pub const fn with_initial_tokens(mut self, tokens: u64) -> Self {
        self.initial_tokens = Some(tokens);
        self
    }

    pub const fn fill_interval(&self) -> Duration {
        self.fill_interval
    }

    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Tokens added per fill interval, with an unset quantum reported as one.
    pub const fn quantum(&self) -> u64 {
        if self.quantum == 0 { 1 } else { self.quantum }
    }

    /// Tokens the bucket starts with, before clamping to the capacity.
    pub const fn initial_tokens(&self) -> u64 {
        match self.initial_tokens {
            Some(tokens) => tokens,
            None => self.capacity,
        }
    }

    /// Returns the rate in tokens per second.
    ///
    /// Zero when the fill interval is zero; such a limit is rejected at
    /// bucket construction.
    pub fn rate_per_second(&self) -> f64 {
        let nanos = self.fill_interval.as_nanos();
        if nanos == 0 {
            return 0.0;
        }
        self.quantum() as f64 * 1e9 / nanos as f64
    }
}

/// Finds the smallest whole-millisecond fill interval and its quantum that
/// realise `rate` tokens per second within [`RATE_MARGIN`].
fn derive_fill_interval(rate: f64) -> Option<(Duration, u64)> {
    if !rate.is_finite() || rate <= 0.0 {
        return None;
    }
    let step_millis = MIN_FILL_INTERVAL.as_millis() as f64;
    // below this even a single token per interval overshoots the margin
    let first = (MILLIS_PER_SECOND / (rate * (1.0 + RATE_MARGIN) * step_millis))
        .floor()
        .max(1.0);
    if first >= u64::MAX as f64 {
        return None;
    }
    let first = first as u64;
    for steps in first..first.saturating_add(MAX_DERIVATION_STEPS) {
        let millis = steps as f64 * step_millis;
        let quantum = (rate * millis / MILLIS_PER_SECOND).round();
        if quantum < 1.0 {
            continue;
        }
        if quantum >= u64::MAX as f64 {
            return None;
        }
        let realised = quantum * MILLIS_PER_SECOND / millis;
        if (realised - rate).abs() / rate <= RATE_MARGIN {
            let fill_interval = MIN_FILL_INTERVAL.checked_mul(u32::try_from(steps).ok()?)?;
            return Some((fill_interval, quantum as u64));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use nonzero_ext::nonzero;

    use super::*;

    fn is_close_to(x: f64, y: f64, tolerance: f64) -> bool {
        (x - y).abs() / y < tolerance
    }

    #[test]
    fn new_defaults() {
        let limit = Limit::new(Duration::from_millis(250), 10);
        assert_eq!(Duration::from_millis(250), limit.fill_interval());
        assert_eq!(10, limit.capacity());
        assert_eq!(1, limit.quantum());
        assert_eq!(10, limit.initial_tokens());
        assert!(is_close_to(limit.rate_per_second(), 4.0, 1e-5));
    }

    #[test]
    fn unset_quantum_is_one() {
        let limit = Limit::new(Duration::from_secs(1), 10).with_quantum(0);
        assert_eq!(1, limit.quantum());
        assert!(is_close_to(limit.rate_per_second(), 1.0, 1e-5));
    }

    #[test]
    fn rate_from_quantum_and_interval() {
        let limit = Limit::new(Duration::from_millis(100), 1).with_quantum(5);
        assert!(is_close_to(limit.rate_per_second(), 50.0, 1e-5));
        let limit = Limit::new(Duration::from_secs(2), 1);
        assert!(is_close_to(limit.rate_per_second(), 0.5, 1e-5));
        let limit = Limit::new(Duration::from_nanos(1), 1);
        assert!(is_close_to(limit.rate_per_second(), 1e9, 1e-5));
        assert_eq!(0.0, Limit::new(Duration::ZERO, 1).rate_per_second());
    }

    #[test]
    fn per_second_exact() {
        let limit = Limit::per_second(nonzero!(10_000u64));
        assert_eq!(10_000, limit.capacity());
        assert_eq!(Duration::from_millis(1), limit.fill_interval());
        assert_eq!(10, limit.quantum());
        assert_eq!(10_000, limit.initial_tokens());
        assert!(is_close_to(limit.rate_per_second(), 10_000.0, 1e-9));
    }

    #[test]
    fn per_second_rounds_quantum_within_margin() {
        let limit = Limit::per_second(nonzero!(10_061u64));
        assert_eq!(10_061, limit.capacity());
        assert_eq!(Duration::from_millis(1), limit.fill_interval());
        assert_eq!(10, limit.quantum());
        assert!(is_close_to(limit.rate_per_second(), 10_000.0, 1e-9));
    }

    #[test]
    fn per_second_slow_rates() {
        // 991ms is the shortest interval whose single token is within 1% of 1/s
        let limit = Limit::per_second(nonzero!(1u64));
        assert_eq!(Duration::from_millis(991), limit.fill_interval());
        assert_eq!(1, limit.quantum());

        let limit = Limit::per_second(nonzero!(3u64));
        assert_eq!(Duration::from_millis(331), limit.fill_interval());
        assert_eq!(1, limit.quantum());

        let limit = Limit::per_second(nonzero!(10u64));
        assert_eq!(Duration::from_millis(100), limit.fill_interval());
        assert_eq!(1, limit.quantum());

        // 1500/s cannot be expressed at 1ms, but 2ms carries exactly 3 tokens
        let limit = Limit::per_second(nonzero!(1_500u64));
        assert_eq!(Duration::from_millis(2), limit.fill_interval());
        assert_eq!(3, limit.quantum());
    }

    #[test]
    fn derived_interval_is_the_shortest_within_margin() {
        for rate in [0.5, 1.0, 3.0, 7.0, 13.0, 99.0, 333.0, 1_500.0, 4_567.0, 1.0 / 3600.0] {
            let (interval, _) = derive_fill_interval(rate).unwrap();
            let millis = interval.as_millis() as u64;
            for shorter in 1..millis {
                let quantum = (rate * shorter as f64 / MILLIS_PER_SECOND).round();
                if quantum < 1.0 {
                    continue;
                }
                let realised = quantum * MILLIS_PER_SECOND / shorter as f64;
                assert!(
                    (realised - rate).abs() / rate > RATE_MARGIN,
                    "rate {rate}: {shorter}ms beats {millis}ms"
                );
            }
        }
    }

    #[test]
    fn per_second_realised_rate_within_margin() {
        for rate in [1u64, 3, 7, 13, 99, 333, 999, 1_001, 4_567, 123_456, 9_999_999] {
            let limit = Limit::per_second(NonZeroU64::new(rate).unwrap());
            assert!(limit.fill_interval() >= MIN_FILL_INTERVAL);
            assert!(limit.quantum() >= 1);
            assert!(
                is_close_to(limit.rate_per_second(), rate as f64, RATE_MARGIN + 1e-9),
                "rate {rate} realised as {:?}",
                limit
            );
        }
    }

    #[test]
    fn per_minute_and_hour() {
        let limit = Limit::per_minute(nonzero!(60u64));
        assert_eq!(Duration::from_millis(991), limit.fill_interval());
        assert_eq!(1, limit.quantum());
        assert_eq!(1, limit.capacity());

        let limit = Limit::per_minute(nonzero!(600u64));
        assert_eq!(Duration::from_millis(100), limit.fill_interval());
        assert_eq!(10, limit.capacity());

        let limit = Limit::per_hour(nonzero!(3600u64));
        assert_eq!(Duration::from_millis(991), limit.fill_interval());
        assert_eq!(1, limit.capacity());

        let limit = Limit::per_hour(nonzero!(1u64));
        assert!(limit.fill_interval() < Duration::from_secs(3600));
        assert!(is_close_to(limit.rate_per_second(), 1.0 / 3600.0, RATE_MARGIN + 1e-9));
        assert_eq!(1, limit.quantum());
        assert_eq!(1, limit.capacity());
    }

    #[test]
    fn with_rate_fractional() {
        let limit = Limit::with_rate(0.5, 3).unwrap();
        assert_eq!(Duration::from_millis(1981), limit.fill_interval());
        assert_eq!(1, limit.quantum());
        assert_eq!(3, limit.capacity());

        let limit = Limit::with_rate(2.5, 3).unwrap();
        assert!(is_close_to(limit.rate_per_second(), 2.5, RATE_MARGIN));
    }

    #[test]
    fn with_rate_rejects_nonsense() {
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                Limit::with_rate(rate, 1),
                Err(BucketError::InvalidRate(_))
            ));
        }
    }

    #[test]
    fn initial_tokens_override() {
        let limit = Limit::new(Duration::from_secs(1), 10).with_initial_tokens(3);
        assert_eq!(3, limit.initial_tokens());
        let limit = limit.with_capacity(20);
        assert_eq!(20, limit.capacity());
        assert_eq!(3, limit.initial_tokens());
    }
}
