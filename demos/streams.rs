use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, stream};
use nonzero_ext::nonzero;
use tickbucket::futures::RateLimitedStreamExt;
use tickbucket::{FastClock, Limit, TokenBucket};
use tokio::task::JoinSet;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let clock = quanta::Clock::new();
    let _quanta_thread = quanta::Upkeep::new_with_clock(Duration::from_micros(150), clock.clone())
        .start()
        .unwrap();
    let clock = FastClock::new(clock);

    // ten streams share one bucket of 5 tokens per second
    let bucket = Arc::new(TokenBucket::with_clock(Limit::per_second(nonzero!(5u64)), clock).unwrap());

    let start = tokio::time::Instant::now();
    let mut handles = JoinSet::new();
    for i in 1..=10 {
        handles.spawn({
            let bucket = Arc::clone(&bucket);
            async move {
                let mut stream1 = std::pin::pin!(stream::iter(1..=10).rate_limit(bucket));
                while let Some(item) = stream1.next().await {
                    println!("[stream={i}] item: {}, elapsed={:?}", item, start.elapsed());
                }
            }
        });
    }

    handles.join_all().await;
    println!("Completed in {:?}", start.elapsed());
}
