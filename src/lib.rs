//! Tickerscout
//!
//! Maps free-text security names (e.g. "Alphabet Inc Class C") to exchange
//! ticker symbols by querying external search providers, scoring candidate
//! matches with domain-specific bias rules, and applying a deterministic
//! selection policy.
//!
//! # Overview
//!
//! The engine supports:
//! - Multiple search providers behind one async trait (Finnhub, Polygon)
//! - Query-variant expansion with alias-table enrichment
//! - Weighted fuzzy scoring with contradiction vetoes and listing biases
//! - Cross-provider aggregation with company-family collapse and a second
//!   refinement pass for weak or foreign-listed top hits
//! - Per-host rate limiting, circuit breaking, TTL and negative caching
//! - A durable name→symbol store and a bounded in-memory result memo
//!
//! # Architecture
//!
//! ```text
//! +-----------------+     +------------------+
//! |  name + options | --> |  SymbolResolver  |  (aggregation, second pass)
//! +-----------------+     +------------------+
//!                             |           |
//!                             v           v
//!                   +----------------+  +----------------+
//!                   | SearchProvider |  | LocalReference |  (opt-in maps)
//!                   +----------------+  +----------------+
//!                             |
//!                             v
//!                   +-----------------+
//!                   | ResilientClient |  (bucket, breaker, caches)
//!                   +-----------------+
//!                             |
//!                             v
//!                   +-----------------+     +------------------+
//!                   |   Candidates    | --> |  choose_symbol   |
//!                   +-----------------+     +------------------+
//!                                                   |
//!                                                   v
//!                                          +-----------------+
//!                                          | ResolutionStore |
//!                                          +-----------------+
//! ```
//!
//! # Core Types
//!
//! - [`SymbolResolver`] - the resolution service
//! - [`ResolverConfig`] - every tunable with defaults
//! - [`Candidate`] - a scored, typed symbol hypothesis
//! - [`Resolution`] - the selection outcome with its reason code
//! - [`SearchOptions`] / [`SearchMeta`] - per-request options and audit data

pub mod config;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod resolver;
pub mod transport;

// Re-export the public surface
pub use config::ResolverConfig;
pub use errors::{ResolverError, RetryClass};
pub use models::{
    rank_candidates, AssetKind, Candidate, RawHit, Resolution, SearchMeta, SearchOptions,
};
pub use provider::{FinnhubProvider, PolygonProvider, SearchProvider};
pub use resolver::{
    choose_symbol, collapse_families, merge_best, LocalReference, ResolutionStore, SymbolResolver,
    STORE_VERSION,
};
pub use transport::{CircuitBreaker, HttpCache, RateLimiter, ResilientClient};
