//! Rate Limiter (Token Bucket)
//!
//! Bounds how fast clients may issue calls. State is one packed atomic
//! word so concurrent handlers never block each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Tokens are tracked in thousandths so slow refill rates still accrue
const MILLI: u64 = 1000;

pub struct RateLimiter {
    /// Upper 32 bits: milli-tokens. Lower 32 bits: ms since `epoch` of the last refill.
    packed: AtomicU64,
    epoch: Instant,
    capacity_milli: u64,
    refill_per_sec: u64,
}

fn pack(milli_tokens: u64, at_ms: u64) -> u64 {
    (milli_tokens << 32) | (at_ms & 0xFFFF_FFFF)
}

fn unpack(packed: u64) -> (u64, u64) {
    (packed >> 32, packed & 0xFFFF_FFFF)
}

impl RateLimiter {
    /// `burst` calls may arrive at once; `refill_per_sec` are restored each second
    pub fn new(burst: u32, refill_per_sec: u32) -> Self {
        // Keep the milli-token count inside 32 bits
        let capacity_milli = (burst as u64 * MILLI).min(u32::MAX as u64);
        Self {
            packed: AtomicU64::new(pack(capacity_milli, 0)),
            epoch: Instant::now(),
            capacity_milli,
            refill_per_sec: refill_per_sec as u64,
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64 & 0xFFFF_FFFF
    }

    fn refilled(&self, milli_tokens: u64, last_ms: u64, now_ms: u64) -> u64 {
        let elapsed = now_ms.wrapping_sub(last_ms) & 0xFFFF_FFFF;
        // refill_per_sec tokens per 1000 ms is refill_per_sec milli-tokens per ms
        (milli_tokens + elapsed * self.refill_per_sec).min(self.capacity_milli)
    }

    /// Take one token; `false` when the bucket is empty
    pub fn try_acquire(&self) -> bool {
        let mut current = self.packed.load(Ordering::Acquire);
        loop {
            let (tokens, last_ms) = unpack(current);
            let now_ms = self.now_ms();
            let available = self.refilled(tokens, last_ms, now_ms);
            let allowed = available >= MILLI;
            let next = if allowed { available - MILLI } else { available };

            match self.packed.compare_exchange_weak(
                current,
                pack(next, now_ms),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return allowed,
                Err(actual) => current = actual,
            }
        }
    }

    /// Whole tokens left right now
    pub fn remaining(&self) -> u32 {
        let (tokens, last_ms) = unpack(self.packed.load(Ordering::Acquire));
        (self.refilled(tokens, last_ms, self.now_ms()) / MILLI) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_burst_then_denied() {
        let limiter = RateLimiter::new(10, 0);
        for _ in 0..10 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
        assert_eq!(limiter.remaining(), 0);
    }

    #[tokio::test]
    async fn test_refills_over_time() {
        let limiter = RateLimiter::new(5, 10);
        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_the_burst() {
        let limiter = Arc::new(RateLimiter::new(100, 0));

        let mut handles = vec![];
        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                (0..20).filter(|_| limiter.try_acquire()).count()
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 100);
    }
}
