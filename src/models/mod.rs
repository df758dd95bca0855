//! Core data types for the resolution engine.
//!
//! - `candidate` - the scored `Candidate` record, `AssetKind`, and ranking
//! - `search` - provider raw hits, per-request options, audit metadata
//! - `decision` - the `Resolution` outcome produced by the selection policy

mod candidate;
mod decision;
mod search;

pub use candidate::{rank_candidates, round2, AssetKind, Candidate};
pub use decision::Resolution;
pub use search::{RawHit, SearchMeta, SearchOptions};
