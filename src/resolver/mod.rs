//! The resolution engine.
//!
//! - `aggregator` - the [`SymbolResolver`] service: provider fan-out,
//!   merge-best combination, family collapse, second pass, memoization,
//!   and the batch API
//! - `decision` - the symbol selection policy
//! - `store` - the durable name→symbol store
//! - `local_data` - optional local reference data

mod aggregator;
mod decision;
mod local_data;
mod store;

pub use aggregator::{collapse_families, merge_best, SymbolResolver};
pub use decision::choose_symbol;
pub use local_data::LocalReference;
pub use store::{ResolutionStore, STORE_VERSION};
