//! Rate-limit policies applied between remote calls.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Seconds as a `Duration`, clamped to `Duration::MAX` when out of range.
fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Waits as needed to keep calls under a request-rate ceiling.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn wait(&self);
}

/// Sleeps a fixed interval every time, regardless of how long the preceding
/// call took, so actual throughput stays at or below the configured rate.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    interval: Duration,
}

impl FixedDelay {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// `1 / rps` seconds between calls. Non-positive rates disable the delay.
    pub fn per_second(rps: f64) -> Self {
        if rps > 0.0 && rps.is_finite() {
            Self::new(saturating_secs(1.0 / rps))
        } else {
            Self::new(Duration::ZERO)
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl Throttle for FixedDelay {
    async fn wait(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Token bucket: up to `burst` calls pass immediately, then calls are spaced
/// to the refill rate. Time spent in the call itself counts toward refill.
pub struct TokenBucket {
    state: Mutex<BucketState>,
    capacity: f64,
    refill_per_sec: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rps: f64, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
            capacity,
            refill_per_sec: rps.max(0.0),
        }
    }
}

#[async_trait]
impl Throttle for TokenBucket {
    async fn wait(&self) {
        let mut guard = self.state.lock().await;
        let now = Instant::now();
        let elapsed = now.duration_since(guard.last_refill).as_secs_f64();
        guard.last_refill = now;
        guard.tokens = (guard.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        if guard.tokens >= 1.0 {
            guard.tokens -= 1.0;
            return;
        }
        if self.refill_per_sec <= 0.0 {
            return;
        }
        let deficit = (1.0 - guard.tokens) / self.refill_per_sec;
        tokio::time::sleep(saturating_secs(deficit)).await;
        guard.tokens = 0.0;
        guard.last_refill = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_second_interval() {
        assert_eq!(FixedDelay::per_second(1.0).interval(), Duration::from_secs(1));
        assert_eq!(FixedDelay::per_second(4.0).interval(), Duration::from_millis(250));
        assert_eq!(FixedDelay::per_second(0.0).interval(), Duration::ZERO);
    }

    #[test]
    fn tiny_rates_saturate_instead_of_panicking() {
        assert_eq!(FixedDelay::per_second(1e-30).interval(), Duration::MAX);
        assert_eq!(saturating_secs(f64::NAN), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn token_bucket_with_tiny_rate_does_not_panic() {
        let throttle = TokenBucket::new(1e-30, 1);
        throttle.wait().await;
        let second = tokio::time::timeout(Duration::from_secs(60), throttle.wait()).await;
        assert!(second.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_sleeps_every_call() {
        let throttle = FixedDelay::per_second(2.0);
        let start = Instant::now();
        for _ in 0..3 {
            throttle.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(start.elapsed() < Duration::from_millis(1600));
    }

    #[tokio::test(start_paused = true)]
    async fn token_bucket_allows_burst_then_spaces_calls() {
        let throttle = TokenBucket::new(1.0, 2);
        let start = Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        assert!(start.elapsed() < Duration::from_millis(10));
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(990));
        assert!(start.elapsed() < Duration::from_millis(1100));
    }
}
