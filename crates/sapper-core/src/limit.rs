//! Global request admission: token bucket with throttle backoff.
//!
//! One limiter instance is shared by every outbound call in the process.
//! All token and backoff accounting sits behind a single mutex.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;

/// Floor for the configured refill rate, one token per ~17 minutes.
const MIN_RATE: f64 = 0.001;

/// Result of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Granted,
    /// Come back after this long.
    RetryAfter(Duration),
}

#[derive(Debug)]
struct LimiterState {
    tokens: f64,
    last_refill: Instant,
    backoff_until: Option<Instant>,
    consecutive_throttles: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
    rate: f64,
    capacity: f64,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl RateLimiter {
    pub fn new(rate: f64, capacity: f64, base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            state: Mutex::new(LimiterState {
                tokens: capacity,
                last_refill: Instant::now(),
                backoff_until: None,
                consecutive_throttles: 0,
            }),
            // A zero or negative rate would make the refill wait
            // unrepresentable as a Duration.
            rate: rate.max(MIN_RATE),
            capacity,
            base_backoff,
            max_backoff,
        }
    }

    /// Try to take a token; never blocks.
    pub fn try_acquire(&self) -> Admission {
        self.try_acquire_at(Instant::now())
    }

    /// Time-parameterized admission, used directly by tests.
    pub fn try_acquire_at(&self, now: Instant) -> Admission {
        let mut state = self.state.lock().expect("limiter lock poisoned");

        if let Some(until) = state.backoff_until {
            if let Some(remaining) = until.checked_duration_since(now) {
                if !remaining.is_zero() {
                    return Admission::RetryAfter(remaining);
                }
            }
            state.backoff_until = None;
        }

        self.refill(&mut state, now);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            Admission::Granted
        } else {
            let wait = (1.0 - state.tokens) / self.rate;
            Admission::RetryAfter(Duration::from_secs_f64(wait.max(0.0)))
        }
    }

    /// Record an external rate-limit rejection. Honors an explicit
    /// retry-after; otherwise exponential backoff with jitter, clamped to
    /// the ceiling. Returns the applied backoff.
    pub fn on_throttled(&self, retry_after: Option<Duration>) -> Duration {
        self.on_throttled_at(Instant::now(), retry_after)
    }

    pub fn on_throttled_at(&self, now: Instant, retry_after: Option<Duration>) -> Duration {
        let mut state = self.state.lock().expect("limiter lock poisoned");
        state.consecutive_throttles += 1;

        let wait = match retry_after {
            Some(explicit) => explicit,
            None => {
                let exp = state.consecutive_throttles.saturating_sub(1).min(5);
                let base = self
                    .base_backoff
                    .saturating_mul(1u32 << exp)
                    .min(self.max_backoff);
                let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..0.1));
                (base + jitter).min(self.max_backoff)
            }
        };

        state.backoff_until = Some(now + wait);
        tracing::warn!(
            consecutive = state.consecutive_throttles,
            backoff_ms = wait.as_millis() as u64,
            "rate limited by arena, backing off"
        );
        wait
    }

    /// Record a successful request: backoff state returns to baseline.
    pub fn on_success(&self) {
        let mut state = self.state.lock().expect("limiter lock poisoned");
        if state.consecutive_throttles > 0 {
            tracing::debug!(
                was = state.consecutive_throttles,
                "rate limit recovered"
            );
        }
        state.consecutive_throttles = 0;
        state.backoff_until = None;
    }

    /// Remaining backoff at `now`, if any.
    pub fn backoff_remaining_at(&self, now: Instant) -> Option<Duration> {
        let state = self.state.lock().expect("limiter lock poisoned");
        state
            .backoff_until
            .and_then(|until| until.checked_duration_since(now))
            .filter(|d| !d.is_zero())
    }

    fn refill(&self, state: &mut LimiterState, now: Instant) {
        let elapsed = now.saturating_duration_since(state.last_refill);
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.rate).min(self.capacity);
        state.last_refill = now;
    }
}
