use std::time::Duration;

/// A bucket could not be constructed from the given [`Limit`](crate::Limit).
///
/// Construction never yields a usable bucket when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum BucketError {
    #[error("token bucket fill interval is not > 0")]
    InvalidFillInterval,
    #[error("token bucket capacity is not > 0")]
    InvalidCapacity,
    #[error("cannot find a suitable quantum for rate {0}")]
    InvalidRate(f64),
}

/// A bounded take or wait needed longer than the caller was willing to wait.
///
/// The bucket is left exactly as it was before the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limited; required wait {required:?} exceeds maximum {max_wait:?}")]
pub struct WaitRefused {
    pub(crate) required: Duration,
    pub(crate) max_wait: Duration,
}

impl WaitRefused {
    /// The wait that would have been committed had the request been accepted.
    ///
    /// This is a hint only; other callers may change the bucket before a retry.
    pub fn required_wait(&self) -> Duration {
        self.required
    }

    /// The maximum wait the caller asked for.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }
}
