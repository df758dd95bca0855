//! Transport resilience layer.
//!
//! Everything that makes repeated external calls safe and cheap:
//! - `rate_limiter` - per-host token buckets
//! - `circuit_breaker` - per-host failure isolation
//! - `http_cache` - TTL payload cache and negative cache
//! - `client` - the resilient GET-JSON client combining all three

mod circuit_breaker;
mod client;
mod http_cache;
mod rate_limiter;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use client::ResilientClient;
pub use http_cache::{request_fingerprint, HttpCache, HttpCacheConfig};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
