use std::time::Duration;

use nonzero_ext::nonzero;
use tickbucket::{Limit, TokenBucket};

fn main() {
    // 10 tokens per second, burst of 20, starting empty
    let limit = Limit::per_second(nonzero!(10u64))
        .with_capacity(20)
        .with_initial_tokens(0);
    let tb = TokenBucket::new(limit).unwrap();
    // after two seconds bucket should be full
    std::thread::sleep(Duration::from_secs(2));
    assert_eq!(20, tb.available());
    assert_eq!(5, tb.take_available(5));

    // more than is left: wait for the rest
    let start = std::time::Instant::now();
    tb.wait(25);
    println!("waited {:?} for 25 tokens", start.elapsed());
}
