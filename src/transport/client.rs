//! Resilient HTTP client for provider calls.
//!
//! Every outbound request runs the same gauntlet: TTL cache, negative
//! cache, circuit breaker, token bucket, then the actual GET with bounded
//! retries. HTTP 429 honors a `Retry-After` header (capped) and counts as
//! a severe breaker failure; 422 is negatively cached and never retried;
//! 5xx retries with backoff and jitter; other 4xx become empty results.

use std::time::Duration;

use log::{debug, error, warn};
use rand::Rng;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use super::http_cache::{request_fingerprint, HttpCache, HttpCacheConfig};
use super::rate_limiter::{RateLimitConfig, RateLimiter};
use crate::config::ResolverConfig;
use crate::errors::ResolverError;

/// Longest sleep a `Retry-After` header can impose per attempt.
const RETRY_AFTER_CAP: Duration = Duration::from_secs(3);

/// Shared HTTP client with per-host rate limiting, circuit breaking and
/// response caching.
pub struct ResilientClient {
    http: Client,
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    cache: HttpCache,
    max_retries: u32,
}

impl ResilientClient {
    pub fn new(config: &ResolverConfig) -> Self {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            limiter: RateLimiter::new(RateLimitConfig {
                qps: config.http_qps,
                burst: config.http_burst,
            }),
            breaker: CircuitBreaker::new(CircuitBreakerConfig {
                fail_threshold: config.breaker_fail_threshold,
                cooldown: config.breaker_cooldown(),
            }),
            cache: HttpCache::new(HttpCacheConfig {
                ttl: config.http_cache_ttl(),
                negative_ttl: config.negative_cache_ttl(),
                max_entries: config.http_cache_max_entries,
            }),
            max_retries: config.http_max_retries.max(1),
        }
    }

    /// GET a JSON payload with the full resilience gauntlet.
    ///
    /// Successful payloads are cached by request fingerprint. Failures
    /// surface as typed errors; callers decide whether to degrade them to
    /// empty results.
    pub async fn get_json(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ResolverError> {
        let fingerprint = request_fingerprint(url, params);

        if let Some(cached) = self.cache.get(&fingerprint) {
            return Ok(cached);
        }

        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| url.to_string());

        if self.cache.negative_hit(&fingerprint) {
            debug!("Negative cache skip for {} params {:?}", url, params);
            return Err(ResolverError::NegativeCached { host });
        }

        if !self.breaker.allow(&host) {
            warn!("Circuit open for host '{}', skipping {}", host, url);
            return Err(ResolverError::CircuitOpen { host });
        }

        let mut saw_rate_limit = false;

        for attempt in 0..self.max_retries {
            self.limiter.acquire(&host, 1.0).await;

            let response = match self.http.get(url).query(params).send().await {
                Ok(r) => r,
                Err(e) => {
                    self.breaker.record_failure(&host, false);
                    error!("HTTP error for {}: {}", url, e);
                    if attempt + 1 == self.max_retries {
                        return Err(if e.is_timeout() {
                            ResolverError::Timeout { host }
                        } else {
                            ResolverError::Network(e)
                        });
                    }
                    self.backoff(attempt, 0.25, 0.2).await;
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                saw_rate_limit = true;
                self.breaker.record_failure(&host, true);
                error!("HTTP 429 for {} params {:?}", url, params);
                match parse_retry_after(response.headers()) {
                    Some(wait) => tokio::time::sleep(wait.min(RETRY_AFTER_CAP)).await,
                    None => self.backoff(attempt, 0.35, 0.25).await,
                }
                continue;
            }

            if status == StatusCode::UNPROCESSABLE_ENTITY {
                self.breaker.record_failure(&host, false);
                self.cache.mark_negative(&fingerprint);
                error!("HTTP 422 for {} params {:?}", url, params);
                return Err(ResolverError::UnprocessableQuery { host });
            }

            if status.is_server_error() {
                self.breaker.record_failure(&host, false);
                error!("HTTP {} for {} params {:?}", status, url, params);
                self.backoff(attempt, 0.22, 0.15).await;
                continue;
            }

            if status.is_client_error() {
                self.breaker.record_failure(&host, false);
                warn!("HTTP {} for {} params {:?}", status, url, params);
                return Err(ResolverError::Status {
                    host,
                    status: status.as_u16(),
                });
            }

            self.breaker.record_success(&host);
            let payload: Value =
                response
                    .json()
                    .await
                    .map_err(|e| ResolverError::Parse {
                        host: host.clone(),
                        message: e.to_string(),
                    })?;
            self.cache.put(&fingerprint, payload.clone());
            return Ok(payload);
        }

        if saw_rate_limit {
            Err(ResolverError::RateLimited { host })
        } else {
            Err(ResolverError::Exhausted { host })
        }
    }

    /// Linear backoff with jitter, slept outside any lock.
    async fn backoff(&self, attempt: u32, step: f64, jitter: f64) {
        let base = step * (attempt + 1) as f64;
        let jitter = rand::thread_rng().gen_range(0.0..jitter);
        tokio::time::sleep(Duration::from_secs_f64(base + jitter)).await;
    }

    /// Breaker handle, for callers that need to consult host state.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Cache handle, exposed for tests and diagnostics.
    pub fn cache(&self) -> &HttpCache {
        &self.cache
    }
}

/// Parse a `Retry-After` header given in seconds.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_parse_retry_after_missing_or_invalid() {
        let headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("-5"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[tokio::test]
    async fn test_open_circuit_short_circuits_requests() {
        let config = ResolverConfig {
            breaker_fail_threshold: 1,
            ..Default::default()
        };
        let client = ResilientClient::new(&config);
        client.breaker().record_failure("finnhub.io", false);

        let result = client
            .get_json("https://finnhub.io/api/v1/search", &[("q", "apple")])
            .await;
        assert!(matches!(result, Err(ResolverError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn test_negative_cache_short_circuits_requests() {
        let config = ResolverConfig::default();
        let client = ResilientClient::new(&config);
        let fingerprint = request_fingerprint("https://finnhub.io/api/v1/search", &[("q", "bad")]);
        client.cache().mark_negative(&fingerprint);

        let result = client
            .get_json("https://finnhub.io/api/v1/search", &[("q", "bad")])
            .await;
        assert!(matches!(result, Err(ResolverError::NegativeCached { .. })));
    }

    #[tokio::test]
    async fn test_cached_payload_returned_without_network() {
        let config = ResolverConfig::default();
        let client = ResilientClient::new(&config);
        let fingerprint =
            request_fingerprint("https://finnhub.io/api/v1/search", &[("q", "apple")]);
        client
            .cache()
            .put(&fingerprint, serde_json::json!({"result": []}));

        let payload = client
            .get_json("https://finnhub.io/api/v1/search", &[("q", "apple")])
            .await
            .unwrap();
        assert_eq!(payload, serde_json::json!({"result": []}));
    }
}
