use std::time::Duration;

use nonzero_ext::nonzero;
use tickbucket::{FastClock, Limit, TokenBucket};

fn main() {
    let clock = quanta::Clock::new();
    // Updates at 1Khz
    let _quanta_thread = quanta::Upkeep::new_with_clock(Duration::from_millis(1), clock.clone())
        .start()
        .unwrap();
    let clock = FastClock::new(clock);
    let limit = Limit::per_second(nonzero!(10u64))
        .with_capacity(20)
        .with_initial_tokens(0);
    let tb = TokenBucket::with_clock(limit, clock).unwrap();
    println!("sleeping for 2 seconds...");
    std::thread::sleep(Duration::from_secs(2));
    println!("available: {}", tb.available());
    assert_eq!(5, tb.take_available(5));
    println!("Took 5, available: {}", tb.available());
}
