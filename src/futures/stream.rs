use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use futures::Stream;
use pin_project_lite::pin_project;

#[cfg(not(feature = "tokio-hrtime"))]
use super::timer::Instant;
use super::timer::{Sleep, sleep};
use crate::{Clock, TokenBucket};

pin_project! {
    /// A stream wrapper that applies rate limiting using a token bucket.
    ///
    /// Each item takes one token. An item is delivered as soon as the inner
    /// stream yields it; if its token was taken on credit, the stream waits
    /// for the debt to be paid before polling the inner stream again.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "async")]
    /// # {
    /// use tickbucket::{Limit, TokenBucket};
    /// use tickbucket::futures::RateLimitedStream;
    /// use futures::stream;
    /// use std::num::NonZeroU64;
    /// use std::sync::Arc;
    ///
    /// let bucket = TokenBucket::new(Limit::per_second(NonZeroU64::new(10).unwrap())).unwrap();
    /// let stream = stream::iter(0..100);
    ///
    /// let rate_limited = RateLimitedStream::new(stream, Arc::new(bucket));
    /// # }
    /// ```
    pub struct RateLimitedStream<S, C>
    where
        S: Stream,
        C: Clock,
    {
        #[pin]
        stream: S,
        bucket: Arc<TokenBucket<C>>,
        #[pin]
        delay: Option<Sleep>,
    }
}

impl<S, C> RateLimitedStream<S, C>
where
    S: Stream,
    C: Clock,
{
    /// Creates a new rate-limited stream.
    ///
    /// The bucket may be shared with other streams or callers.
    pub fn new(stream: S, bucket: Arc<TokenBucket<C>>) -> Self {
        Self {
            stream,
            bucket,
            delay: None,
        }
    }

    pub fn bucket(&self) -> &Arc<TokenBucket<C>> {
        &self.bucket
    }

    /// Tokens currently available in the bucket, negative while in debt.
    pub fn available(&self) -> i64 {
        self.bucket.available()
    }
}

impl<S, C> Stream for RateLimitedStream<S, C>
where
    S: Stream,
    C: Clock,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // still paying for the previous item?
        if let Some(delay) = this.delay.as_mut().as_pin_mut() {
            ready!(delay.poll(cx));
            this.delay.set(None);
        }

        let next_item = ready!(this.stream.poll_next(cx));
        if next_item.is_none() {
            return Poll::Ready(None);
        }

        let wait = this.bucket.take(1);
        if !wait.is_zero() {
            set_delay(this.delay, wait);
        }
        Poll::Ready(next_item)
    }
}

pin_project! {
    /// A stream that is rate limited by a token bucket with weighted consumption.
    ///
    /// Each item takes `weight_fn(&item)` tokens and is held back until those
    /// tokens have arrived.
    pub struct WeightedStream<S, C, F>
    where
        S: Stream,
        C: Clock,
        F: Fn(&S::Item) -> u64,
    {
        #[pin]
        stream: S,
        bucket: Arc<TokenBucket<C>>,
        weight_fn: F,
        #[pin]
        delay: Option<Sleep>,
        pending_item: Option<S::Item>,
    }
}

impl<S, C, F> WeightedStream<S, C, F>
where
    S: Stream,
    C: Clock,
    F: Fn(&S::Item) -> u64,
{
    /// Creates a new weighted stream.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tickbucket::futures::WeightedStream;
    /// use tickbucket::{Limit, TokenBucket, TokioClock};
    /// use futures::stream;
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let limit = Limit::new(Duration::from_millis(100), 10);
    /// let bucket = TokenBucket::with_clock(limit, TokioClock::default()).unwrap();
    ///
    /// let stream = stream::iter(vec!["small", "large", "medium"]);
    /// let weighted_stream = WeightedStream::new(stream, Arc::new(bucket), |item: &&str| {
    ///     item.len() as u64
    /// });
    /// ```
    pub fn new(stream: S, bucket: Arc<TokenBucket<C>>, weight_fn: F) -> Self {
        Self {
            stream,
            bucket,
            weight_fn,
            delay: None,
            pending_item: None,
        }
    }

    pub fn bucket(&self) -> &Arc<TokenBucket<C>> {
        &self.bucket
    }

    /// Tokens currently available in the bucket, negative while in debt.
    pub fn available(&self) -> i64 {
        self.bucket.available()
    }
}

impl<S, C, F> Stream for WeightedStream<S, C, F>
where
    S: Stream,
    C: Clock,
    F: Fn(&S::Item) -> u64,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if this.pending_item.is_some() {
            if let Some(delay) = this.delay.as_mut().as_pin_mut() {
                ready!(delay.poll(cx));
                this.delay.set(None);
            }
            return Poll::Ready(this.pending_item.take());
        }

        match ready!(this.stream.poll_next(cx)) {
            Some(item) => {
                let wait = this.bucket.take((this.weight_fn)(&item));
                if wait.is_zero() {
                    return Poll::Ready(Some(item));
                }
                *this.pending_item = Some(item);
                set_delay(this.delay, wait);
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            None => Poll::Ready(None),
        }
    }
}

fn set_delay(mut delay: Pin<&mut Option<Sleep>>, wait: Duration) {
    #[cfg(feature = "tokio-hrtime")]
    {
        delay.set(Some(sleep(wait)));
    }
    #[cfg(not(feature = "tokio-hrtime"))]
    {
        if let Some(delay) = delay.as_mut().as_pin_mut() {
            delay.reset(Instant::now() + wait);
        } else {
            delay.set(Some(sleep(wait)));
        }
    }
}
