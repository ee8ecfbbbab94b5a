//! Lock-free per-source-IP token bucket (spec §4.J, §5).
//!
//! Capacity = `rate_limit_rps` tokens refilled over a 60 s window, plus a
//! burst allowance of `rate_limit_rps / 10`. Each bucket is a single
//! `AtomicU64` packing `(tokens_milli: u32, last_refill_ms: u32)`;
//! refill-and-acquire is one compare-and-swap, retried on contention —
//! no per-bucket mutex.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct RateLimiter {
    buckets: DashMap<String, AtomicU64>,
    capacity: f64,
    max_tokens: f64,
    refill_per_sec: f64,
    started: Instant,
}

impl RateLimiter {
    pub fn new(rate_limit_rps: u32) -> Self {
        let capacity = rate_limit_rps.max(1) as f64;
        let burst = capacity / 10.0;
        Self {
            buckets: DashMap::new(),
            capacity,
            max_tokens: capacity + burst,
            refill_per_sec: capacity / 60.0,
            started: Instant::now(),
        }
    }

    fn encode(tokens: f64, last_refill_ms: u32) -> u64 {
        let tokens_milli = (tokens * 1000.0).round().clamp(0.0, u32::MAX as f64) as u32;
        ((tokens_milli as u64) << 32) | last_refill_ms as u64
    }

    fn decode(bits: u64) -> (f64, u32) {
        let tokens_milli = (bits >> 32) as u32;
        let last_refill_ms = bits as u32;
        (tokens_milli as f64 / 1000.0, last_refill_ms)
    }

    /// Admits one request against `key`'s bucket, or rejects it with the
    /// number of whole seconds until at least one token is available.
    pub fn try_acquire(&self, key: &str) -> Result<(), u64> {
        let now_ms = self.started.elapsed().as_millis() as u32;
        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| AtomicU64::new(Self::encode(self.capacity, now_ms)));

        loop {
            let current = entry.load(Ordering::Acquire);
            let (tokens, last_refill_ms) = Self::decode(current);
            let elapsed_s = now_ms.saturating_sub(last_refill_ms) as f64 / 1000.0;
            let refilled = (tokens + elapsed_s * self.refill_per_sec).min(self.max_tokens);

            if refilled < 1.0 {
                let deficit = 1.0 - refilled;
                let retry_after = (deficit / self.refill_per_sec).ceil().max(1.0) as u64;
                let new_bits = Self::encode(refilled, now_ms);
                let _ = entry.compare_exchange(current, new_bits, Ordering::AcqRel, Ordering::Acquire);
                return Err(retry_after);
            }

            let new_bits = Self::encode(refilled - 1.0, now_ms);
            match entry.compare_exchange(current, new_bits, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return Ok(()),
                Err(_) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_starts_at_capacity_not_capacity_plus_burst() {
        // spec §8 E5: rate_limit_rps=10 admits exactly the first 10
        // requests in the same second; the 11th and 12th are rejected.
        let limiter = RateLimiter::new(10);
        let mut admitted = 0;
        for _ in 0..12 {
            if limiter.try_acquire("1.2.3.4").is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }

    #[test]
    fn exhausted_bucket_reports_nonzero_retry_after() {
        let limiter = RateLimiter::new(1);
        for _ in 0..5 {
            let _ = limiter.try_acquire("5.6.7.8");
        }
        let retry_after = limiter.try_acquire("5.6.7.8").unwrap_err();
        assert!(retry_after >= 1);
    }

    #[test]
    fn distinct_keys_have_independent_buckets() {
        let limiter = RateLimiter::new(1);
        for _ in 0..2 {
            let _ = limiter.try_acquire("a");
        }
        assert!(limiter.try_acquire("a").is_err());
        assert!(limiter.try_acquire("b").is_ok());
    }
}
