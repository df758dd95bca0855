//! TTL and negative caches for provider responses.
//!
//! Both caches key on a fingerprint of the request: the URL plus its
//! parameter set, sorted so parameter order never splits entries. The TTL
//! cache stores successful JSON payloads; the negative cache stores only a
//! timestamp marking "recently failed with a non-retryable error, skip".
//! Stale entries are treated as misses and removed lazily on access. The
//! payload cache is size-capped: going over cap drops the oldest 10%.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::warn;
use serde_json::Value;

/// Fingerprint of a request: md5 over the URL and the sorted parameter set.
pub fn request_fingerprint(url: &str, params: &[(&str, &str)]) -> String {
    let mut sorted: Vec<(&str, &str)> = params.to_vec();
    sorted.sort();
    let mut blob = String::from(url);
    for (k, v) in sorted {
        blob.push('&');
        blob.push_str(k);
        blob.push('=');
        blob.push_str(v);
    }
    format!("{:x}", md5::compute(blob.as_bytes()))
}

/// Configuration for the response caches.
#[derive(Clone, Debug)]
pub struct HttpCacheConfig {
    /// Lifetime of cached successful payloads.
    pub ttl: Duration,
    /// Lifetime of negative entries.
    pub negative_ttl: Duration,
    /// Payload entry cap; exceeded, the oldest 10% are dropped.
    pub max_entries: usize,
}

impl Default for HttpCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            negative_ttl: Duration::from_secs(180),
            max_entries: 4096,
        }
    }
}

/// In-memory TTL cache plus negative cache for provider responses.
pub struct HttpCache {
    config: HttpCacheConfig,
    entries: Mutex<HashMap<String, (Instant, Value)>>,
    negative: Mutex<HashMap<String, Instant>>,
}

impl HttpCache {
    pub fn new(config: HttpCacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            negative: Mutex::new(HashMap::new()),
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, (Instant, Value)>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("HTTP cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_negative(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.negative.lock().unwrap_or_else(|poisoned| {
            warn!("Negative cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Cached payload for a fingerprint, if present and fresh.
    pub fn get(&self, fingerprint: &str) -> Option<Value> {
        let mut entries = self.lock_entries();
        match entries.get(fingerprint) {
            Some((stored_at, payload)) => {
                if stored_at.elapsed() > self.config.ttl {
                    entries.remove(fingerprint);
                    None
                } else {
                    Some(payload.clone())
                }
            }
            None => None,
        }
    }

    /// Store a successful payload.
    pub fn put(&self, fingerprint: &str, payload: Value) {
        let mut entries = self.lock_entries();
        entries.insert(fingerprint.to_string(), (Instant::now(), payload));
        if entries.len() > self.config.max_entries {
            Self::prune(&mut entries);
        }
    }

    /// Drop the oldest 10% of entries (at least one).
    fn prune(entries: &mut HashMap<String, (Instant, Value)>) {
        let mut by_age: Vec<(String, Instant)> = entries
            .iter()
            .map(|(k, (at, _))| (k.clone(), *at))
            .collect();
        by_age.sort_by_key(|(_, at)| *at);
        let drop_count = (by_age.len() / 10).max(1);
        for (key, _) in by_age.into_iter().take(drop_count) {
            entries.remove(&key);
        }
    }

    /// Whether a fingerprint was recently marked as a known-bad request.
    pub fn negative_hit(&self, fingerprint: &str) -> bool {
        let mut negative = self.lock_negative();
        match negative.get(fingerprint) {
            Some(marked_at) => {
                if marked_at.elapsed() > self.config.negative_ttl {
                    negative.remove(fingerprint);
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }

    /// Mark a fingerprint as a known-bad request.
    pub fn mark_negative(&self, fingerprint: &str) {
        self.lock_negative()
            .insert(fingerprint.to_string(), Instant::now());
    }

    /// Number of live payload entries (stale ones included until touched).
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HttpCache {
    fn default() -> Self {
        Self::new(HttpCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(ttl_ms: u64, neg_ttl_ms: u64, max: usize) -> HttpCache {
        HttpCache::new(HttpCacheConfig {
            ttl: Duration::from_millis(ttl_ms),
            negative_ttl: Duration::from_millis(neg_ttl_ms),
            max_entries: max,
        })
    }

    #[test]
    fn test_fingerprint_ignores_param_order() {
        let a = request_fingerprint("https://finnhub.io/api/v1/search", &[("q", "apple"), ("token", "k")]);
        let b = request_fingerprint("https://finnhub.io/api/v1/search", &[("token", "k"), ("q", "apple")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_distinguishes_params() {
        let a = request_fingerprint("https://finnhub.io/api/v1/search", &[("q", "apple")]);
        let b = request_fingerprint("https://finnhub.io/api/v1/search", &[("q", "alphabet")]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_put_get_roundtrip() {
        let c = cache(60_000, 60_000, 16);
        c.put("fp1", json!({"result": []}));
        assert_eq!(c.get("fp1"), Some(json!({"result": []})));
        assert_eq!(c.get("fp2"), None);
    }

    #[test]
    fn test_stale_entry_is_a_miss_and_removed() {
        let c = cache(10, 60_000, 16);
        c.put("fp1", json!(1));
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(c.get("fp1"), None);
        assert!(c.is_empty());
    }

    #[test]
    fn test_negative_cache_expires() {
        let c = cache(60_000, 10, 16);
        c.mark_negative("fp1");
        assert!(c.negative_hit("fp1"));
        std::thread::sleep(Duration::from_millis(25));
        assert!(!c.negative_hit("fp1"));
    }

    #[test]
    fn test_prune_drops_oldest_tenth() {
        let c = cache(60_000, 60_000, 20);
        for i in 0..20 {
            c.put(&format!("fp{}", i), json!(i));
            // Distinct insertion instants so "oldest" is well defined
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(c.len(), 20);
        c.put("fp20", json!(20));
        // 21 entries > cap 20: two (10% of 21) oldest dropped
        assert_eq!(c.len(), 19);
        assert_eq!(c.get("fp0"), None);
        assert_eq!(c.get("fp20"), Some(json!(20)));
    }
}
