//! Search request/response models shared by the provider adapters and the
//! aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AssetKind;

/// A raw hit from a provider's free-text search endpoint, before scoring.
#[derive(Clone, Debug)]
pub struct RawHit {
    /// Symbol/ticker as reported by the provider.
    pub symbol: String,

    /// Description or long name as reported by the provider.
    pub name: String,

    /// Asset classification mapped from the provider's type field.
    pub kind: AssetKind,
}

/// Per-request options for candidate search.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Consult local reference data (canon maps, alias table, securities
    /// master) in addition to the external providers. `None` falls back to
    /// the engine-wide default, which is providers-only.
    pub use_local_maps: Option<bool>,
}

/// Audit metadata describing how a search was performed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchMeta {
    /// Query variants derived from the input name, in attempt order.
    pub search_variants: Vec<String>,

    /// Wall-clock duration of the whole search, in milliseconds.
    pub api_latency_ms: u64,

    /// Whether local reference data was enabled for this request.
    pub use_local_maps: bool,

    /// Engine version the result was produced with.
    pub resolver_version: String,

    /// When the search completed.
    pub resolved_at: DateTime<Utc>,
}
