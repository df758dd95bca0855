//! Engine configuration.
//!
//! Every tunable of the resolution engine lives here with a sensible
//! default, so a caller can build a working resolver from
//! `ResolverConfig::default()` plus API keys. The crate never reads the
//! process environment itself; wiring env/files into this struct is the
//! embedding application's job.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration for a [`SymbolResolver`](crate::resolver::SymbolResolver)
/// and its transport layer.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Finnhub API key. Without it the Finnhub adapter is silently skipped.
    pub finnhub_api_key: Option<String>,

    /// Polygon API key. Without it the Polygon adapter is silently skipped.
    pub polygon_api_key: Option<String>,

    /// Master switch for the Polygon adapter.
    pub enable_polygon: bool,

    /// Prefer domestic (US-shaped) listings when scoring and collapsing
    /// multi-listing families. Also gates the second refinement pass.
    pub prefer_us_listings: bool,

    /// Treat 5-letter OTC/ADR symbols ending in Y or F as domestic-shaped.
    pub prefer_otc: bool,

    /// Default for requests that don't specify `use_local_maps`.
    pub use_local_maps_default: bool,

    /// When locals are enabled, allow the token-postings fast index to
    /// short-circuit resolution at `local_accept_score`.
    pub local_first: bool,

    /// Acceptance score for the local fast index.
    pub local_accept_score: f64,

    /// Query both providers concurrently. When false, the secondary
    /// provider is only consulted if the primary result is unconvincing.
    pub parallel_providers: bool,

    /// Concurrent variant queries per adapter. 0 keeps the sequential
    /// early-exit behavior.
    pub variant_concurrency: usize,

    /// Cap on derived query variants per name.
    pub max_variants: usize,

    /// Cap on the ranked candidate list returned to callers.
    pub top_k: usize,

    /// Stop issuing variant queries once a domestic-shaped candidate
    /// reaches this score.
    pub early_exit_score: f64,

    /// Enable the second refinement pass for weak or foreign top hits.
    pub second_pass_enabled: bool,

    /// How many collapsed family representatives seed the second pass.
    pub second_pass_top_k: usize,

    /// Cap on extra queries issued by the second pass.
    pub max_second_pass_queries: usize,

    /// Concurrent name resolutions in `resolve_many`.
    pub batch_workers: usize,

    /// Capacity of the aggregator's memoized result cache.
    pub candidate_cache_size: usize,

    /// Token bucket refill rate per host, in requests per second.
    pub http_qps: f64,

    /// Token bucket capacity (burst size) per host.
    pub http_burst: u32,

    /// Weighted failures before a host's circuit opens.
    pub breaker_fail_threshold: u32,

    /// Seconds a tripped circuit stays open.
    pub breaker_cooldown_secs: f64,

    /// Per-request HTTP timeout in seconds.
    pub http_timeout_secs: f64,

    /// Attempts per request (including the first).
    pub http_max_retries: u32,

    /// TTL for cached successful payloads, in seconds.
    pub http_cache_ttl_secs: f64,

    /// Entry cap for the payload cache; over cap, the oldest 10% drop.
    pub http_cache_max_entries: usize,

    /// TTL for negative cache entries, in seconds.
    pub negative_cache_ttl_secs: f64,

    /// Directory holding the durable name→symbol store.
    pub store_dir: PathBuf,

    /// Read resolved symbols back from the durable store.
    pub store_read: bool,

    /// Persist accepted symbols to the durable store.
    pub store_write: bool,

    /// Delete the durable store when the resolver is constructed.
    pub store_clear_on_start: bool,

    /// Optional securities master table (symbol, name, type columns).
    pub master_path: PathBuf,

    /// Optional ETF canonical-name→symbol JSON map.
    pub etf_canon_path: PathBuf,

    /// Optional alias JSON map (name → symbols and/or query expansions).
    pub aliases_path: PathBuf,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            finnhub_api_key: None,
            polygon_api_key: None,
            enable_polygon: true,
            prefer_us_listings: true,
            prefer_otc: true,
            use_local_maps_default: false,
            local_first: false,
            local_accept_score: 0.90,
            parallel_providers: true,
            variant_concurrency: 0,
            max_variants: 8,
            top_k: 10,
            early_exit_score: 0.92,
            second_pass_enabled: true,
            second_pass_top_k: 1,
            max_second_pass_queries: 6,
            batch_workers: 8,
            candidate_cache_size: 4096,
            http_qps: 0.8,
            http_burst: 2,
            breaker_fail_threshold: 14,
            breaker_cooldown_secs: 18.0,
            http_timeout_secs: 4.0,
            http_max_retries: 2,
            http_cache_ttl_secs: 3600.0,
            http_cache_max_entries: 4096,
            negative_cache_ttl_secs: 180.0,
            store_dir: PathBuf::from(".cache"),
            store_read: true,
            store_write: true,
            store_clear_on_start: false,
            master_path: PathBuf::from("assets/securities_master.csv"),
            etf_canon_path: PathBuf::from("assets/etf_canon.json"),
            aliases_path: PathBuf::from("assets/aliases.json"),
        }
    }
}

impl ResolverConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.http_timeout_secs)
    }

    pub fn breaker_cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.breaker_cooldown_secs)
    }

    pub fn http_cache_ttl(&self) -> Duration {
        Duration::from_secs_f64(self.http_cache_ttl_secs)
    }

    pub fn negative_cache_ttl(&self) -> Duration {
        Duration::from_secs_f64(self.negative_cache_ttl_secs)
    }
}
