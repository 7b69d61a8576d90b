//! Async waiting and stream throttling on top of [`TokenBucket`].
//!
//! Requires the "async" feature. Sleeping uses tokio's timer, or
//! `tokio-hrtime` when that feature is enabled.

mod stream;
mod timer;

use std::sync::Arc;
use std::time::Duration;

pub use stream::{RateLimitedStream, WeightedStream};

use futures::Stream;

use crate::{Clock, TokenBucket, WaitRefused};

impl<C: Clock> TokenBucket<C> {
    /// Async version of [`wait`](TokenBucket::wait).
    ///
    /// The tokens are committed before the first await point, so dropping the
    /// future does not give them back.
    pub async fn wait_async(&self, count: u64) {
        let wait = self.take(count);
        if !wait.is_zero() {
            timer::sleep(wait).await;
        }
    }

    /// Async version of [`wait_max_duration`](TokenBucket::wait_max_duration).
    pub async fn wait_max_duration_async(
        &self,
        count: u64,
        max_wait: Duration,
    ) -> Result<(), WaitRefused> {
        let wait = self.take_max_duration(count, max_wait)?;
        if !wait.is_zero() {
            timer::sleep(wait).await;
        }
        Ok(())
    }
}

pub trait RateLimitedStreamExt<S, C>
where
    S: Stream,
    C: Clock,
{
    /// Charges one token per item.
    fn rate_limit(self, bucket: Arc<TokenBucket<C>>) -> RateLimitedStream<S, C>;

    /// Charges `weight_fn(&item)` tokens per item.
    fn rate_limit_weighted<F>(
        self,
        bucket: Arc<TokenBucket<C>>,
        weight_fn: F,
    ) -> WeightedStream<S, C, F>
    where
        F: Fn(&S::Item) -> u64;
}

impl<S, C> RateLimitedStreamExt<S, C> for S
where
    S: Stream,
    C: Clock,
{
    fn rate_limit(self, bucket: Arc<TokenBucket<C>>) -> RateLimitedStream<S, C> {
        RateLimitedStream::new(self, bucket)
    }

    fn rate_limit_weighted<F>(
        self,
        bucket: Arc<TokenBucket<C>>,
        weight_fn: F,
    ) -> WeightedStream<S, C, F>
    where
        F: Fn(&S::Item) -> u64,
    {
        WeightedStream::new(self, bucket, weight_fn)
    }
}
