use std::time::Duration;

/// `min(base * 2^attempt, cap)`, saturating.
pub fn exponential_delay(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(cap).min(cap)
}

/// Attempt counter for repeated connect failures.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap: cap.max(base),
            attempt: 0,
        }
    }

    /// Delay before the next attempt; advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = exponential_delay(self.base, self.cap, self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_base_up_to_cap() {
        let mut b = Backoff::new(Duration::from_secs(1), Duration::from_secs(32));
        let delays: Vec<u64> = (0..8).map(|_| b.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 32, 32]);
    }

    #[test]
    fn huge_attempt_counts_saturate_at_cap() {
        let cap = Duration::from_secs(32);
        assert_eq!(exponential_delay(Duration::from_secs(1), cap, 40), cap);
        assert_eq!(exponential_delay(Duration::from_secs(1), cap, u32::MAX), cap);
    }

    #[test]
    fn reset_starts_over() {
        let mut b = Backoff::new(Duration::from_secs(2), Duration::from_secs(60));
        b.next_delay();
        b.next_delay();
        b.reset();
        assert_eq!(b.attempt(), 0);
        assert_eq!(b.next_delay(), Duration::from_secs(2));
    }
}
