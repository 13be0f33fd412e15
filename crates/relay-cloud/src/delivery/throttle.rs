//! Outbound bandwidth ceiling.

use std::time::Duration;

use tokio::time::Instant;

/// Byte-granular token bucket.
///
/// Capacity equals one second of traffic and the bucket starts full.
/// Taking more than is available puts the bucket into debt; the caller
/// waits until the debt would have been refilled.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    capacity: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(bytes_per_sec: u64) -> Self {
        let rate = bytes_per_sec.max(1) as f64;
        Self {
            rate,
            capacity: rate,
            tokens: rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
            self.last_refill = now;
        }
    }

    /// Take `bytes` and return how long the caller must wait before sending.
    pub fn take(&mut self, bytes: u64, now: Instant) -> Duration {
        self.refill(now);
        self.tokens -= bytes as f64;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / self.rate)
        }
    }

    pub fn available(&self) -> f64 {
        self.tokens
    }
}

/// Optional shared bucket. `None` means unlimited.
#[derive(Debug)]
pub struct Throttle {
    bucket: Option<tokio::sync::Mutex<TokenBucket>>,
}

impl Throttle {
    pub fn new(bytes_per_sec: Option<u64>) -> Self {
        Self {
            bucket: bytes_per_sec.map(|rate| tokio::sync::Mutex::new(TokenBucket::new(rate))),
        }
    }

    pub fn unlimited() -> Self {
        Self { bucket: None }
    }

    /// Wait until `bytes` may be sent.
    pub async fn acquire(&self, bytes: u64) {
        let Some(bucket) = &self.bucket else {
            return;
        };
        let wait = bucket.lock().await.take(bytes, Instant::now());
        if !wait.is_zero() {
            tracing::trace!(bytes, wait_ms = wait.as_millis() as u64, "delivery: throttled");
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_up_to_capacity_is_free() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(1000);
        assert_eq!(bucket.take(600, now), Duration::ZERO);
        assert_eq!(bucket.take(400, now), Duration::ZERO);
        assert_eq!(bucket.take(500, now), Duration::from_millis(500));
    }

    #[test]
    fn refill_never_exceeds_capacity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(100);
        bucket.take(100, start);
        bucket.refill(start + Duration::from_secs(60));
        assert_eq!(bucket.available(), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_rate_is_held() {
        let throttle = Throttle::new(Some(1000));
        let start = Instant::now();
        for _ in 0..5 {
            throttle.acquire(1000).await;
        }
        // First second is the initial burst; four more seconds of debt.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(4), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(4100), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn unlimited_never_waits() {
        let throttle = Throttle::unlimited();
        let start = Instant::now();
        throttle.acquire(10_000_000).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
