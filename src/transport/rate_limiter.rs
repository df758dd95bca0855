//! Per-host token bucket rate limiter.
//!
//! Each external host gets its own bucket with configurable refill rate and
//! burst capacity. Buckets are created lazily on first use and kept for the
//! life of the process. `acquire` blocks the calling task (looping with
//! short sleeps) until tokens are available; the balance never goes
//! negative, and there is no fairness guarantee across waiters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

/// Default refill rate: under one request per second keeps free-tier APIs
/// comfortable.
const DEFAULT_QPS: f64 = 0.8;

/// Default burst capacity.
const DEFAULT_BURST: u32 = 2;

/// Longest single sleep while waiting for tokens; the loop re-checks the
/// bucket after each nap.
const MAX_NAP: Duration = Duration::from_secs(1);

/// Token bucket for a single host.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of available tokens.
    tokens: f64,
    /// Last time the bucket was refilled.
    last_update: Instant,
    /// Token refill rate (tokens per second).
    rate: f64,
    /// Maximum bucket capacity.
    capacity: f64,
}

impl TokenBucket {
    fn new(qps: f64, burst: u32) -> Self {
        let capacity = (burst as f64).max(1.0);
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: qps.max(0.01),
            capacity,
        }
    }

    /// Refill tokens based on elapsed wall-clock time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    /// Take `n` tokens if available.
    fn try_take(&mut self, n: f64) -> bool {
        self.refill();
        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }

    /// Time until `n` tokens will be available.
    fn time_until(&mut self, n: f64) -> Duration {
        self.refill();
        if self.tokens >= n {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((n - self.tokens) / self.rate)
        }
    }
}

/// Rate limiter configuration for one host.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Refill rate in tokens (requests) per second.
    pub qps: f64,
    /// Burst capacity.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            qps: DEFAULT_QPS,
            burst: DEFAULT_BURST,
        }
    }
}

/// Per-host token bucket rate limiter.
///
/// Thread-safe; the mutex is held only to inspect and update a bucket,
/// never across a sleep, so other workers are not blocked while one waits
/// out its backoff.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Lock the buckets mutex, recovering from poison if necessary.
    ///
    /// Worst case after recovery is slightly off rate accounting, which
    /// beats panicking inside every provider call.
    fn lock_buckets(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Acquire `n` tokens for `host`, waiting as long as it takes.
    ///
    /// The wait is computed under the lock and slept outside it.
    pub async fn acquire(&self, host: &str, n: f64) {
        loop {
            let wait = {
                let mut buckets = self.lock_buckets();
                let bucket = buckets
                    .entry(host.to_string())
                    .or_insert_with(|| TokenBucket::new(self.config.qps, self.config.burst));
                if bucket.try_take(n) {
                    return;
                }
                bucket.time_until(n)
            };
            let nap = wait.min(MAX_NAP);
            debug!("Rate limiter: waiting {:?} for host '{}'", nap, host);
            tokio::time::sleep(nap).await;
        }
    }

    /// Take one token for `host` without waiting.
    pub fn try_acquire(&self, host: &str) -> bool {
        let mut buckets = self.lock_buckets();
        let bucket = buckets
            .entry(host.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.qps, self.config.burst));
        bucket.try_take(1.0)
    }

    /// Remaining tokens for `host` after refill.
    pub fn remaining_tokens(&self, host: &str) -> f64 {
        let mut buckets = self.lock_buckets();
        match buckets.get_mut(host) {
            Some(bucket) => {
                bucket.refill();
                bucket.tokens
            }
            None => self.config.burst as f64,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_drains_to_zero_not_below() {
        let mut bucket = TokenBucket::new(1.0, 2);
        assert!(bucket.try_take(1.0));
        assert!(bucket.try_take(1.0));
        assert!(!bucket.try_take(1.0));
        assert!(bucket.tokens >= 0.0);
    }

    #[test]
    fn test_bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(1.0, 1);
        assert!(bucket.try_take(1.0));
        assert!(!bucket.try_take(1.0));
        // Simulate two seconds of elapsed time
        bucket.last_update = Instant::now() - Duration::from_secs(2);
        assert!(bucket.try_take(1.0));
        // Capacity caps the refill: only one token was available
        assert!(!bucket.try_take(1.0));
    }

    #[test]
    fn test_per_host_isolation() {
        let limiter = RateLimiter::new(RateLimitConfig { qps: 1.0, burst: 1 });
        assert!(limiter.try_acquire("finnhub.io"));
        assert!(!limiter.try_acquire("finnhub.io"));
        assert!(limiter.try_acquire("api.polygon.io"));
    }

    #[test]
    fn test_remaining_tokens() {
        let limiter = RateLimiter::new(RateLimitConfig { qps: 1.0, burst: 2 });
        assert!((limiter.remaining_tokens("finnhub.io") - 2.0).abs() < 0.01);
        limiter.try_acquire("finnhub.io");
        assert!(limiter.remaining_tokens("finnhub.io") < 1.01);
    }

    #[tokio::test]
    async fn test_acquire_waits_at_least_refill_interval() {
        // 100 tokens/sec for a fast test: the third acquire needs ~10ms
        let limiter = RateLimiter::new(RateLimitConfig {
            qps: 100.0,
            burst: 2,
        });
        limiter.acquire("finnhub.io", 1.0).await;
        limiter.acquire("finnhub.io", 1.0).await;

        let start = Instant::now();
        limiter.acquire("finnhub.io", 1.0).await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(5),
            "expected a rate-limit wait, got {:?}",
            elapsed
        );
        assert!(limiter.remaining_tokens("finnhub.io") >= 0.0);
    }
}
