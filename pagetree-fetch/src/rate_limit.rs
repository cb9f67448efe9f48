//! Token bucket shared by all workers of a run.
//!
//! Capacity equals the per-minute budget and refills continuously at
//! `requests_per_minute / 60` tokens per second. A reset leaves exactly one
//! token, so the first request of a run goes out immediately and `N`
//! requests take about `N / R` minutes.
//!
//! Waiters are queued on a fair [`tokio::sync::Mutex`]; the holder sleeps
//! until its token is available, so requests are granted in FIFO order.
//! All timing uses the Tokio clock, which tests can pause and advance.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, trace};

/// Configuration of the request budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    /// Maximum burst size.
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_per_sec: f64,
}

impl RateLimitConfig {
    /// Budget of `requests` per minute.
    pub fn per_minute(requests: u32) -> Self {
        let capacity = f64::from(requests.max(1));
        Self {
            capacity,
            refill_per_sec: capacity / 60.0,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    config: RateLimitConfig,
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.config.refill_per_sec).min(self.config.capacity);
        self.last_refill = now;
    }
}

/// FIFO token-bucket rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Creates a limiter holding a single token.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            bucket: Mutex::new(Bucket {
                config,
                tokens: 1.0,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Creates a limiter for `requests` per minute.
    pub fn per_minute(requests: u32) -> Self {
        Self::new(RateLimitConfig::per_minute(requests))
    }

    /// Replaces the budget and drops accumulated tokens down to one.
    pub async fn reset(&self, config: RateLimitConfig) {
        let mut bucket = self.bucket.lock().await;
        bucket.config = config;
        bucket.tokens = 1.0;
        bucket.last_refill = Instant::now();
        debug!(capacity = config.capacity, "Rate limiter reset");
    }

    /// Waits until a token is available and takes it.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(Instant::now());

        if bucket.tokens < 1.0 {
            let missing = 1.0 - bucket.tokens;
            let wait = Duration::from_secs_f64(missing / bucket.config.refill_per_sec);
            trace!(wait_ms = wait.as_millis(), "Waiting for rate limit token");
            sleep(wait).await;
            bucket.refill(Instant::now());
            // Rounding can leave the bucket a hair below one token here.
            bucket.tokens = bucket.tokens.max(1.0);
        }

        bucket.tokens -= 1.0;
    }

    /// Returns the number of whole tokens currently available.
    pub async fn available(&self) -> u32 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(Instant::now());
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = bucket.tokens.floor() as u32;
        whole
    }
}

// ============================================================================
// Tests
// ============================================================================
