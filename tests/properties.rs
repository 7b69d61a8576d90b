use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tickbucket::{Limit, ManualClock, TokenBucket};

#[derive(Debug, Clone)]
enum Op {
    Advance(u64),
    Take(u64),
    TakeMax(u64, u64),
    TakeAvailable(u64),
    Available,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..5_000).prop_map(Op::Advance),
        (0u64..50).prop_map(Op::Take),
        (0u64..50, 0u64..2_000).prop_map(|(count, max)| Op::TakeMax(count, max)),
        (0u64..50).prop_map(Op::TakeAvailable),
        Just(Op::Available),
    ]
}

fn limit() -> impl Strategy<Value = Limit> {
    (1u64..500, 1u64..40, 0u64..8, 0u64..60).prop_map(|(interval, capacity, quantum, initial)| {
        Limit::new(Duration::from_millis(interval), capacity)
            .with_quantum(quantum)
            .with_initial_tokens(initial)
    })
}

fn bucket(limit: Limit) -> (Arc<ManualClock>, TokenBucket<Arc<ManualClock>>) {
    let clock = Arc::new(ManualClock::default());
    let bucket = TokenBucket::with_clock(limit, Arc::clone(&clock)).unwrap();
    (clock, bucket)
}

fn apply(clock: &ManualClock, bucket: &TokenBucket<Arc<ManualClock>>, op: &Op) {
    match *op {
        Op::Advance(millis) => clock.advance(Duration::from_millis(millis)),
        Op::Take(count) => {
            bucket.take(count);
        }
        Op::TakeMax(count, max) => {
            let _ = bucket.take_max_duration(count, Duration::from_millis(max));
        }
        Op::TakeAvailable(count) => {
            bucket.take_available(count);
        }
        Op::Available => {
            bucket.available();
        }
    }
}

proptest! {
    #[test]
    fn available_never_exceeds_capacity(limit in limit(), ops in prop::collection::vec(op(), 0..64)) {
        let (clock, tb) = bucket(limit);
        let capacity = tb.capacity() as i64;
        prop_assert!(tb.available() <= capacity);
        for op in &ops {
            apply(&clock, &tb, op);
            prop_assert!(tb.available() <= capacity, "after {:?}", op);
        }
        clock.advance(Duration::from_secs(365 * 24 * 3600));
        prop_assert!(tb.available() <= capacity);
    }

    #[test]
    fn refused_take_changes_nothing(
        limit in limit(),
        ops in prop::collection::vec(op(), 0..32),
        count in 1u64..100,
    ) {
        let (clock, tb) = bucket(limit);
        for op in &ops {
            apply(&clock, &tb, op);
        }
        let before = tb.available();
        prop_assert_eq!(Duration::ZERO, tb.take(0));
        if let Err(refused) = tb.take_max_duration(count, Duration::ZERO) {
            prop_assert!(refused.required_wait() > Duration::ZERO);
            prop_assert_eq!(before, tb.available());
            // the same request is accepted once the caller allows the hinted wait
            let wait = tb.take_max_duration(count, refused.required_wait());
            prop_assert_eq!(Ok(refused.required_wait()), wait);
            prop_assert_eq!(before - count as i64, tb.available());
        } else {
            prop_assert_eq!(before - count as i64, tb.available());
        }
    }

    #[test]
    fn reads_are_idempotent(limit in limit(), ops in prop::collection::vec(op(), 0..32)) {
        let (clock, tb) = bucket(limit);
        for op in &ops {
            apply(&clock, &tb, op);
        }
        prop_assert_eq!(tb.available(), tb.available());
    }

    #[test]
    fn waits_grow_with_outstanding_debt(
        limit in limit(),
        counts in prop::collection::vec(1u64..20, 1..16),
    ) {
        let (_clock, tb) = bucket(limit);
        let mut last = Duration::ZERO;
        for count in counts {
            let wait = tb.take(count);
            prop_assert!(wait >= last);
            last = wait;
        }
    }

    #[test]
    fn take_available_saturates(limit in limit(), ops in prop::collection::vec(op(), 0..32), count in 0u64..100) {
        let (clock, tb) = bucket(limit);
        for op in &ops {
            apply(&clock, &tb, op);
        }
        let before = tb.available();
        let taken = tb.take_available(count);
        prop_assert!(taken <= count);
        prop_assert_eq!(taken as i64, before.max(0).min(count as i64));
        prop_assert_eq!(before - taken as i64, tb.available());
    }

    #[test]
    fn no_tokens_before_a_full_interval(
        interval in 2u64..1_000,
        capacity in 1u64..100,
        take in 0u64..100,
        sleep_fraction in 0.0f64..1.0,
    ) {
        let (clock, tb) = bucket(Limit::new(Duration::from_millis(interval), capacity));
        tb.take_available(take);
        let after_take = tb.available();
        let sleep = ((interval as f64 * sleep_fraction) as u64).min(interval - 1);
        clock.advance(Duration::from_millis(sleep));
        prop_assert_eq!(after_take, tb.available());
        clock.set(Duration::from_millis(interval));
        prop_assert_eq!((after_take + 1).min(capacity as i64), tb.available());
    }
}
