use std::sync::Arc;
use std::time::Duration;

use futures::stream;
use tickbucket::futures::{RateLimitedStreamExt, WeightedStream};
use tickbucket::{Limit, TokenBucket, TokioClock};
use tokio_stream::StreamExt;

#[derive(Debug, Clone)]
struct Task {
    name: String,
    size: u64,
}

impl Task {
    fn new(name: &str, size: u64) -> Self {
        Self {
            name: name.to_string(),
            size,
        }
    }
}

#[tokio::main]
async fn main() {
    println!("WeightedStream Example");
    println!("=====================");

    let tasks = vec![
        Task::new("small_task", 1),
        Task::new("medium_task", 5),
        Task::new("large_task", 10),
        Task::new("tiny_task", 1),
        Task::new("huge_task", 20),
    ];

    let stream = stream::iter(tasks);

    // 1 token every 200ms (5 per second) with a burst of 25
    let limit = Limit::new(Duration::from_millis(200), 25);
    let bucket = Arc::new(TokenBucket::with_clock(limit, TokioClock::default()).unwrap());

    // each task consumes tokens equal to its size
    let weighted_stream = WeightedStream::new(stream, bucket, |task: &Task| task.size);

    println!("Processing tasks with weighted throttling...");
    println!("Throttling: 5 tokens/second, burst: 25 tokens");
    println!();

    let start = std::time::Instant::now();
    let mut weighted_stream = std::pin::pin!(weighted_stream);

    while let Some(task) = weighted_stream.next().await {
        let elapsed = start.elapsed();
        println!(
            "[{:>6.2}s] Processed task '{}' (size: {} tokens)",
            elapsed.as_secs_f64(),
            task.name,
            task.size
        );
    }

    let total_elapsed = start.elapsed();
    println!();
    println!("Total time: {:.2}s", total_elapsed.as_secs_f64());

    println!();
    println!("Using extension trait:");
    println!("=====================");

    let tasks2 = vec!["short", "medium_length", "very_long_string_here", "x"];

    let stream2 = stream::iter(tasks2);
    let limit2 = Limit::with_rate(3.0, 25).unwrap();
    let bucket2 = Arc::new(TokenBucket::with_clock(limit2, TokioClock::default()).unwrap());

    // string length decides the cost
    let weighted_stream2 = stream2.rate_limit_weighted(bucket2, |text: &&str| text.len() as u64);

    let start2 = std::time::Instant::now();
    let mut weighted_stream2 = std::pin::pin!(weighted_stream2);

    while let Some(text) = weighted_stream2.next().await {
        let elapsed = start2.elapsed();
        println!(
            "[{:>6.2}s] Processed text '{}' (length: {} tokens)",
            elapsed.as_secs_f64(),
            text,
            text.len()
        );
    }

    let total_elapsed2 = start2.elapsed();
    println!();
    println!("Total time: {:.2}s", total_elapsed2.as_secs_f64());
}
