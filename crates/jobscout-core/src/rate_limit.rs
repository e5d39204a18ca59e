//! Token-bucket rate limiting for outbound requests.
//!
//! Each scraper owns one [`RateLimiter`] so independent sources never wait
//! on each other. Tokens accumulate at `rate` per second up to `burst`;
//! every request consumes one.
//!
//! # Example
//!
//! ```rust,no_run
//! use jobscout_core::rate_limit::RateLimiter;
//!
//! # async fn run() -> Result<(), jobscout_core::AppError> {
//! // One request every ten seconds, no banking beyond a single token.
//! let limiter = RateLimiter::new(0.1, 1)?;
//! limiter.acquire().await;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::AppError;

/// Absorbs float drift so a fully refilled token is never missed.
const TOKEN_EPSILON: f64 = 1e-9;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, rate: f64, capacity: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * rate).min(capacity);
        self.last_refill = now;
    }
}

/// Async token bucket.
///
/// The whole acquire loop runs under the bucket's mutex, so concurrent
/// callers are served one at a time in roughly FIFO order. Cloning shares
/// the same bucket.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    rate: f64,
    burst: u32,
    bucket: Arc<Mutex<Bucket>>,
}

impl RateLimiter {
    /// Create a limiter adding `rate` tokens per second, banking at most
    /// `burst`. The bucket starts full.
    pub fn new(rate: f64, burst: u32) -> Result<Self, AppError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(AppError::ConfigError(format!(
                "Rate limit must be a positive number of requests per second, got {rate}"
            )));
        }
        if burst == 0 {
            return Err(AppError::ConfigError(
                "Rate limit burst must be at least 1".into(),
            ));
        }

        Ok(Self {
            rate,
            burst,
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            })),
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Wait until a token is available, then consume it.
    ///
    /// Cannot be aborted once called other than by dropping the future.
    pub async fn acquire(&self) {
        let capacity = f64::from(self.burst);
        let mut bucket = self.bucket.lock().await;

        loop {
            bucket.refill(self.rate, capacity);

            if bucket.tokens + TOKEN_EPSILON >= 1.0 {
                bucket.tokens = (bucket.tokens - 1.0).max(0.0);
                return;
            }

            let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate)
                .max(Duration::from_millis(1));
            tracing::debug!(
                wait_ms = %wait.as_millis(),
                tokens = bucket.tokens,
                "Rate limit reached, waiting for next token"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens currently banked, after a lazy refill. Does not consume.
    pub async fn available(&self) -> f64 {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(self.rate, f64::from(self.burst));
        bucket.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected} tokens, got {actual}"
        );
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(
            RateLimiter::new(0.0, 1),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            RateLimiter::new(-1.0, 1),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            RateLimiter::new(f64::NAN, 1),
            Err(AppError::ConfigError(_))
        ));
        assert!(matches!(
            RateLimiter::new(1.0, 0),
            Err(AppError::ConfigError(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn bucket_starts_full() {
        let limiter = RateLimiter::new(1.0, 3).unwrap();
        assert_close(limiter.available().await, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_accumulate_up_to_burst() {
        let limiter = RateLimiter::new(2.0, 10).unwrap();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert_close(limiter.available().await, 0.0);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_close(limiter.available().await, 6.0);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_close(limiter.available().await, 10.0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_acquire_waits_one_period() {
        let limiter = RateLimiter::new(1.0, 1).unwrap();

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));

        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(990) && elapsed < Duration::from_millis(1100),
            "second acquire should block for about one second, elapsed: {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_never_go_negative() {
        let limiter = RateLimiter::new(5.0, 2).unwrap();
        for _ in 0..12 {
            limiter.acquire().await;
            assert!(limiter.available().await >= 0.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_serialized() {
        let limiter = RateLimiter::new(10.0, 1).unwrap();
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // One banked token, then four refills at 100ms each.
        assert!(start.elapsed() >= Duration::from_millis(399));
    }

    #[tokio::test(start_paused = true)]
    async fn separate_limiters_are_independent() {
        let a = RateLimiter::new(1.0, 1).unwrap();
        let b = RateLimiter::new(1.0, 1).unwrap();

        let start = Instant::now();
        a.acquire().await;
        b.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
