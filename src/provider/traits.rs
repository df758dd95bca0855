//! Search provider trait definition.
//!
//! Implement [`SearchProvider`] to add a new external symbol-search source.
//! The aggregator drives every configured provider through the same
//! variant/scoring pipeline; an adapter only has to turn one query string
//! into raw hits.

use async_trait::async_trait;

use crate::errors::ResolverError;
use crate::models::RawHit;
use crate::transport::ResilientClient;

/// Trait for external free-text symbol-search providers.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Unique identifier, used as the candidate source tag
    /// (e.g. "Finnhub", "Polygon").
    fn id(&self) -> &'static str;

    /// Hostname the adapter talks to; keys the per-host rate limiter and
    /// circuit breaker.
    fn host(&self) -> &'static str;

    /// Whether the adapter has what it needs (typically an API key).
    /// Unconfigured providers are skipped silently.
    fn is_configured(&self) -> bool;

    /// Run one raw search query through the resilient client and map the
    /// payload to hits. Implementations should not retry internally; the
    /// client owns retries.
    async fn search_raw(
        &self,
        client: &ResilientClient,
        query: &str,
    ) -> Result<Vec<RawHit>, ResolverError>;
}
