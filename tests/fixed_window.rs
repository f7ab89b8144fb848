//! Fixed-window properties of the decision engine over the in-memory store.

use std::sync::Arc;
use std::time::Duration;
use turnstile::{
    DecisionEngine, InMemoryCounterStore, ManualClock, RateKey, RateLimitConfig,
};

fn engine(
    limit: u32,
    window: Duration,
    clock: Arc<ManualClock>,
) -> DecisionEngine<InMemoryCounterStore> {
    DecisionEngine::new(
        Arc::new(InMemoryCounterStore::with_clock(clock)),
        RateLimitConfig::new(limit, window).unwrap(),
    )
}

#[tokio::test]
async fn admits_min_of_calls_and_limit_within_one_window() {
    let clock = Arc::new(ManualClock::new());
    let engine = engine(5, Duration::from_secs(60), clock);
    let key = RateKey::new("k");

    let mut admitted = 0;
    let mut denied = 0;
    for call in 1..=20u64 {
        let decision = engine.evaluate(&key).await.unwrap();
        // Running count tracks calls made, not calls admitted.
        assert_eq!(decision.current_count, call);
        if decision.admitted {
            admitted += 1;
        } else {
            denied += 1;
        }
    }
    assert_eq!(admitted, 5);
    assert_eq!(denied, 15);
}

#[tokio::test]
async fn window_expiry_resets_the_count_regardless_of_prior_denials() {
    let clock = Arc::new(ManualClock::new());
    let engine = engine(2, Duration::from_secs(30), clock.clone());
    let key = RateKey::new("k");

    for _ in 0..6 {
        engine.evaluate(&key).await.unwrap();
    }
    clock.advance(Duration::from_secs(30));

    let fresh = engine.evaluate(&key).await.unwrap();
    assert!(fresh.admitted);
    assert_eq!(fresh.current_count, 1);
}

#[tokio::test]
async fn one_per_second_policy() {
    let clock = Arc::new(ManualClock::new());
    let engine = engine(1, Duration::from_secs(1), clock.clone());
    let key = RateKey::new("k");

    assert!(engine.evaluate(&key).await.unwrap().admitted);

    clock.advance(Duration::from_millis(400));
    let denied = engine.evaluate(&key).await.unwrap();
    assert!(!denied.admitted);
    let retry_after = denied.retry_after.unwrap();
    assert!(retry_after > Duration::ZERO);
    assert!(retry_after <= Duration::from_secs(1));

    clock.advance(retry_after);
    assert!(engine.evaluate(&key).await.unwrap().admitted);
}

#[tokio::test]
async fn distinct_keys_never_share_a_counter() {
    let clock = Arc::new(ManualClock::new());
    let engine = engine(1, Duration::from_secs(60), clock);

    assert!(engine.evaluate(&RateKey::new("alpha")).await.unwrap().admitted);
    assert!(!engine.evaluate(&RateKey::new("alpha")).await.unwrap().admitted);

    // Denials against one key leave the other untouched.
    let other = engine.evaluate(&RateKey::new("beta")).await.unwrap();
    assert!(other.admitted);
    assert_eq!(other.current_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_calls_lose_no_increments() {
    const TASKS: usize = 8;
    const CALLS_PER_TASK: usize = 25;
    const LIMIT: u32 = 40;

    let clock = Arc::new(ManualClock::new());
    let engine = engine(LIMIT, Duration::from_secs(600), clock);
    let key = RateKey::new("contended");

    let mut handles = Vec::new();
    for _ in 0..TASKS {
        let engine = engine.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            let mut decisions = Vec::with_capacity(CALLS_PER_TASK);
            for _ in 0..CALLS_PER_TASK {
                decisions.push(engine.evaluate(&key).await.unwrap());
            }
            decisions
        }));
    }

    let mut counts = Vec::new();
    let mut admitted = 0usize;
    for handle in handles {
        for decision in handle.await.unwrap() {
            counts.push(decision.current_count);
            if decision.admitted {
                admitted += 1;
            }
        }
    }

    // Which callers win at the boundary is unspecified; the aggregates are not.
    let total = TASKS * CALLS_PER_TASK;
    assert_eq!(admitted, LIMIT as usize);
    counts.sort_unstable();
    let expected: Vec<u64> = (1..=total as u64).collect();
    assert_eq!(counts, expected);
}
