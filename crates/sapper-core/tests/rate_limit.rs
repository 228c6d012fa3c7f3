use std::time::{Duration, Instant};

use sapper_core::limit::{Admission, RateLimiter};

fn limiter() -> RateLimiter {
    RateLimiter::new(
        3.0,
        3.0,
        Duration::from_millis(500),
        Duration::from_secs(16),
    )
}

#[test]
fn bucket_empties_then_refills_over_time() {
    let limiter = limiter();
    let t0 = Instant::now();

    for _ in 0..3 {
        assert_eq!(limiter.try_acquire_at(t0), Admission::Granted);
    }
    match limiter.try_acquire_at(t0) {
        Admission::RetryAfter(wait) => {
            // One token at 3/s takes about a third of a second.
            assert!(wait <= Duration::from_millis(334));
        }
        Admission::Granted => panic!("bucket should be empty"),
    }

    // A full second restores the full burst.
    let t1 = t0 + Duration::from_secs(1);
    for _ in 0..3 {
        assert_eq!(limiter.try_acquire_at(t1), Admission::Granted);
    }
}

#[test]
fn zero_rate_is_clamped_to_a_finite_wait() {
    let limiter = RateLimiter::new(
        0.0,
        1.0,
        Duration::from_millis(500),
        Duration::from_secs(16),
    );
    let t0 = Instant::now();

    assert_eq!(limiter.try_acquire_at(t0), Admission::Granted);
    match limiter.try_acquire_at(t0) {
        Admission::RetryAfter(wait) => {
            assert!(wait > Duration::ZERO);
            assert!(wait <= Duration::from_secs(1_000));
        }
        Admission::Granted => panic!("bucket should be empty"),
    }
}

#[test]
fn refill_never_exceeds_capacity() {
    let limiter = limiter();
    let t0 = Instant::now();
    let t1 = t0 + Duration::from_secs(60);

    for _ in 0..3 {
        assert_eq!(limiter.try_acquire_at(t1), Admission::Granted);
    }
    assert!(matches!(
        limiter.try_acquire_at(t1),
        Admission::RetryAfter(_)
    ));
}

#[test]
fn ten_throttles_back_off_monotonically_and_bounded() {
    let limiter = limiter();
    let t0 = Instant::now();

    let mut waits = Vec::new();
    for i in 0..10u64 {
        let now = t0 + Duration::from_secs(i * 60);
        waits.push(limiter.on_throttled_at(now, None));
    }

    let max = Duration::from_secs(16);
    for pair in waits.windows(2) {
        assert!(pair[1] >= pair[0], "backoff shrank: {:?}", waits);
    }
    for &wait in waits.iter() {
        assert!(wait <= max, "backoff exceeded ceiling: {wait:?}");
    }
    // The first wait starts from the base, not the ceiling.
    assert!(waits[0] < Duration::from_millis(600));
}

#[test]
fn success_resets_the_backoff_sequence() {
    let limiter = limiter();
    let t0 = Instant::now();

    for _ in 0..5 {
        limiter.on_throttled_at(t0, None);
    }
    limiter.on_success();
    assert!(limiter.backoff_remaining_at(t0).is_none());

    // The next throttle starts over from the base delay.
    let wait = limiter.on_throttled_at(t0, None);
    assert!(wait < Duration::from_millis(600));
}

#[test]
fn explicit_retry_after_is_honored() {
    let limiter = limiter();
    let t0 = Instant::now();

    let wait = limiter.on_throttled_at(t0, Some(Duration::from_secs(2)));
    assert_eq!(wait, Duration::from_secs(2));

    match limiter.try_acquire_at(t0 + Duration::from_secs(1)) {
        Admission::RetryAfter(remaining) => assert_eq!(remaining, Duration::from_secs(1)),
        Admission::Granted => panic!("still inside the server-mandated backoff"),
    }
    assert!(matches!(
        limiter.try_acquire_at(t0 + Duration::from_secs(2)),
        Admission::Granted
    ));
}

#[test]
fn acquire_is_blocked_while_backing_off() {
    let limiter = limiter();
    let t0 = Instant::now();

    let wait = limiter.on_throttled_at(t0, None);
    assert!(matches!(
        limiter.try_acquire_at(t0 + wait / 2),
        Admission::RetryAfter(_)
    ));
    assert!(matches!(
        limiter.try_acquire_at(t0 + wait),
        Admission::Granted
    ));
}
