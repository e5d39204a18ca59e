//! Exponential backoff with optional jitter around a fallible async call.
//!
//! Delay schedule before retry `n` (1-indexed):
//! `min(max_delay, base_delay * 2^(n-1))`, then scaled by a uniform factor in
//! `[0.5, 1.5)` when jitter is enabled. Worst-case added latency is therefore
//! bounded by roughly `max_retries * max_delay * 1.5`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::AppError;

/// Retry configuration. Cheap to clone; holds no per-call state.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts allowed after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Backoff before retry `retry_count` (1-indexed), without jitter.
    pub fn delay_for_retry(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor: f64 = rand::rng().random_range(0.5..1.5);
        Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }

    /// Run `operation` until it succeeds or `max_retries + 1` attempts fail.
    ///
    /// Every error is retried; the last one is returned on exhaustion.
    /// `label` only appears in log lines.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut retry_count = 0u32;

        loop {
            match operation().await {
                Ok(value) => {
                    if retry_count > 0 {
                        tracing::info!(
                            %label,
                            attempts = retry_count + 1,
                            "Recovered after {} failed attempt(s)",
                            retry_count
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > self.max_retries {
                        tracing::error!(
                            %label,
                            attempts = retry_count,
                            error = %e,
                            "Giving up after {} attempts",
                            retry_count
                        );
                        return Err(e);
                    }

                    let delay = self.apply_jitter(self.delay_for_retry(retry_count));
                    tracing::warn!(
                        %label,
                        attempt = retry_count,
                        max_attempts = self.max_retries + 1,
                        delay_ms = %delay.as_millis(),
                        error = %e,
                        "Attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    use super::*;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries)
            .with_base_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(10))
            .with_jitter(false)
    }

    /// Operation that fails `failures` times, then returns the attempt number.
    fn flaky(
        failures: u32,
        calls: Arc<AtomicU32>,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<u32, AppError>> + Send>>
    {
        move || {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= failures {
                    Err(AppError::NetworkError(format!("failure {n}")))
                } else {
                    Ok(n)
                }
            })
        }
    }

    #[test]
    fn delay_schedule_doubles_and_caps() {
        let policy = RetryPolicy::new(10)
            .with_base_delay(Duration::from_secs(5))
            .with_max_delay(Duration::from_secs(300))
            .with_jitter(false);

        assert_eq!(policy.delay_for_retry(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for_retry(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for_retry(3), Duration::from_secs(20));
        assert_eq!(policy.delay_for_retry(6), Duration::from_secs(160));
        assert_eq!(policy.delay_for_retry(7), Duration::from_secs(300));
        assert_eq!(policy.delay_for_retry(64), Duration::from_secs(300));
    }

    #[test]
    fn jitter_stays_within_half_to_one_and_a_half() {
        let policy = RetryPolicy::default().with_jitter(true);
        let base = Duration::from_millis(1000);
        for _ in 0..200 {
            let d = policy.apply_jitter(base);
            assert!(d >= Duration::from_millis(500));
            assert!(d < Duration::from_millis(1500));
        }
    }

    #[test]
    fn jitter_saturates_on_huge_delays() {
        let policy = RetryPolicy::new(40)
            .with_base_delay(Duration::from_secs(u64::MAX / 4))
            .with_max_delay(Duration::MAX);
        let delay = policy.delay_for_retry(30);
        assert_eq!(delay, Duration::MAX);
        for _ in 0..50 {
            assert!(policy.apply_jitter(delay) >= delay / 2);
        }
    }

    #[test]
    fn jitter_disabled_is_identity() {
        let policy = RetryPolicy::default().with_jitter(false);
        assert_eq!(
            policy.apply_jitter(Duration::from_millis(750)),
            Duration::from_millis(750)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_k_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(3);

        let result = policy.execute("flaky", flaky(2, calls.clone())).await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_operation_runs_max_retries_plus_one() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(4);

        let err = policy
            .execute("broken", flaky(u32::MAX, calls.clone()))
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(err.to_string(), "Network error: failure 5");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(0);

        assert!(policy.execute("once", flaky(1, calls.clone())).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_sleeps_follow_schedule() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = fast_policy(3);
        let start = Instant::now();

        let _ = policy.execute("timed", flaky(u32::MAX, calls)).await;

        // 100ms + 200ms + 400ms
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(700) && elapsed < Duration::from_millis(710),
            "unexpected total backoff: {elapsed:?}"
        );
    }
}
