//! Single-tenant token bucket.

use std::time::{Duration, Instant};

/// Continuously refilling token bucket.
///
/// Refill is computed lazily from the elapsed time at each acquire, so no
/// timer runs per bucket. `tokens` stays within `[0, max_tokens]`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a full bucket holding `max_tokens`, refilling at
    /// `refill_rate` tokens per second.
    pub fn new(max_tokens: f64, refill_rate: f64, now: Instant) -> Self {
        let max_tokens = max_tokens.max(1.0);
        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate: refill_rate.max(0.0),
            last_refill: now,
        }
    }

    /// A bucket admitting `max_requests` per `window`, refilled smoothly.
    pub fn per_window(max_requests: u32, window: Duration, now: Instant) -> Self {
        let max = f64::from(max_requests.max(1));
        let secs = window.as_secs_f64().max(f64::EPSILON);
        Self::new(max, max / secs, now)
    }

    fn refill(&mut self, now: Instant) {
        // Callers may race to read the clock before taking the lock; never
        // move the refill point backwards.
        if now <= self.last_refill {
            return;
        }
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    /// Takes one token if available.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Takes one token if available, treating `now` as the current time.
    pub fn try_acquire_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn available(&self) -> f64 {
        self.tokens
    }

    pub fn max_tokens(&self) -> f64 {
        self.max_tokens
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    pub fn last_refill(&self) -> Instant {
        self.last_refill
    }

    /// Whether the bucket has not been touched for at least `ttl` as of `now`.
    pub fn is_idle(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_refill) >= ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_full() {
        let bucket = TokenBucket::per_window(60, Duration::from_secs(60), Instant::now());
        assert_eq!(bucket.available(), 60.0);
        assert_eq!(bucket.max_tokens(), 60.0);
        assert_eq!(bucket.refill_rate(), 1.0);
    }

    #[test]
    fn conserves_tokens_then_refills_one_per_second() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(60.0, 1.0, t0);

        for i in 0..60 {
            assert!(bucket.try_acquire_at(t0), "request {i} should be admitted");
        }
        assert!(!bucket.try_acquire_at(t0), "61st request should be rejected");

        let t1 = t0 + Duration::from_secs(1);
        assert!(bucket.try_acquire_at(t1));
        assert!(!bucket.try_acquire_at(t1));
    }

    #[test]
    fn refill_is_capped() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(5.0, 1.0, t0);
        assert!(bucket.try_acquire_at(t0));
        bucket.refill(t0 + Duration::from_secs(3600));
        assert_eq!(bucket.available(), 5.0);
    }

    #[test]
    fn partial_refill_is_not_a_token() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(1.0, 1.0, t0);
        assert!(bucket.try_acquire_at(t0));
        assert!(!bucket.try_acquire_at(t0 + Duration::from_millis(500)));
        assert!(bucket.try_acquire_at(t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn rejection_leaves_budget_untouched() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::new(1.0, 0.5, t0);
        assert!(bucket.try_acquire_at(t0));
        for _ in 0..10 {
            assert!(!bucket.try_acquire_at(t0));
        }
        assert_eq!(bucket.available(), 0.0);
        assert!(bucket.try_acquire_at(t0 + Duration::from_secs(2)));
    }

    #[test]
    fn clock_going_backwards_is_ignored() {
        let t0 = Instant::now() + Duration::from_secs(10);
        let mut bucket = TokenBucket::new(2.0, 1.0, t0);
        assert!(bucket.try_acquire_at(t0));
        assert!(bucket.try_acquire_at(t0 - Duration::from_secs(5)));
        assert!(!bucket.try_acquire_at(t0 - Duration::from_secs(5)));
        assert_eq!(bucket.last_refill(), t0);
    }

    #[test]
    fn idle_check() {
        let t0 = Instant::now();
        let bucket = TokenBucket::new(1.0, 1.0, t0);
        let ttl = Duration::from_secs(600);
        assert!(!bucket.is_idle(t0 + Duration::from_secs(599), ttl));
        assert!(bucket.is_idle(t0 + ttl, ttl));
    }

    #[test]
    fn zero_requests_is_clamped() {
        let t0 = Instant::now();
        let mut bucket = TokenBucket::per_window(0, Duration::from_secs(60), t0);
        assert!(bucket.try_acquire_at(t0));
        assert!(!bucket.try_acquire_at(t0));
    }
}
