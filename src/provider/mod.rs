//! Provider adapters and the shared per-adapter search pipeline.
//!
//! Every adapter runs the same pipeline: derive query variants, issue them
//! through the resilient client (sequentially with early exit, or
//! concurrently up to a configured limit), score the raw hits, synthesize
//! domestic-stem and share-class hypotheses, then dedupe, rank and cap.

mod finnhub;
mod hypotheses;
mod polygon;
mod traits;

pub use finnhub::FinnhubProvider;
pub use hypotheses::{add_domestic_hypotheses, add_share_class_hypotheses};
pub use polygon::PolygonProvider;
pub use traits::SearchProvider;

use std::collections::{HashMap, HashSet};

use futures::stream::{self, StreamExt};
use log::warn;

use crate::config::ResolverConfig;
use crate::models::{rank_candidates, Candidate, RawHit};
use crate::normalize::scoring::Scorer;
use crate::normalize::variants::variants_for_name;
use crate::normalize::{expected_kind, simplify_name};
use crate::transport::ResilientClient;

/// Score one batch of raw hits against the input name.
fn score_hits(
    hits: Vec<RawHit>,
    name: &str,
    simplified: &str,
    scorer: &Scorer,
    tag: &str,
) -> Vec<Candidate> {
    let expected = expected_kind(name);
    hits.into_iter()
        .map(|hit| {
            let base = crate::normalize::scoring::fuzzy_score(name, &hit.name);
            let score = scorer.apply_biases(
                &hit.symbol,
                base,
                simplified,
                hit.kind,
                expected,
                name,
                &hit.name,
            );
            Candidate::new(hit.symbol, hit.name, hit.kind, score, tag)
        })
        .collect()
}

/// Run the full adapter pipeline for one provider and one name.
///
/// Returns a deduplicated (by symbol, first occurrence wins within the
/// provider), ranked, length-capped candidate list. Provider errors degrade
/// to empty per-variant results; the engine never fails because one host
/// is down.
pub(crate) async fn gather_candidates(
    provider: &dyn SearchProvider,
    client: &ResilientClient,
    name: &str,
    tag: &str,
    config: &ResolverConfig,
    alias_expansions: &HashMap<String, Vec<String>>,
) -> Vec<Candidate> {
    if !provider.is_configured() {
        return Vec::new();
    }

    let simplified = simplify_name(name);
    let scorer = Scorer {
        prefer_us_listings: config.prefer_us_listings,
        prefer_otc: config.prefer_otc,
    };
    let variants = variants_for_name(name, alias_expansions, config.max_variants);

    let mut out: Vec<Candidate> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut best_domestic_score = 0.0_f64;

    let run_query = |query: String| async move {
        match provider.search_raw(client, &query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("{}: query '{}' degraded to empty: {}", provider.id(), query, e);
                Vec::new()
            }
        }
    };

    let fold_in = |batch: Vec<Candidate>,
                       out: &mut Vec<Candidate>,
                       seen: &mut HashSet<String>,
                       best: &mut f64| {
        for c in batch {
            if seen.contains(&c.symbol) {
                continue;
            }
            seen.insert(c.symbol.clone());
            if c.score > *best && scorer.is_domestic_symbol(&c.symbol) {
                *best = c.score;
            }
            out.push(c);
        }
    };

    if config.variant_concurrency > 0 {
        // Concurrent variants: bounded, batches folded in submission order
        // so the output stays deterministic. No early exit on this path.
        let batches: Vec<Vec<RawHit>> = stream::iter(variants)
            .map(|q| run_query(q))
            .buffered(config.variant_concurrency)
            .collect()
            .await;
        for hits in batches {
            let batch = score_hits(hits, name, &simplified, &scorer, tag);
            fold_in(batch, &mut out, &mut seen, &mut best_domestic_score);
        }
    } else {
        for query in variants {
            let hits = run_query(query).await;
            let batch = score_hits(hits, name, &simplified, &scorer, tag);
            fold_in(batch, &mut out, &mut seen, &mut best_domestic_score);
            if best_domestic_score >= config.early_exit_score {
                break;
            }
        }
    }

    let out = add_domestic_hypotheses(out, &scorer);
    let mut out = add_share_class_hypotheses(out, &scorer);
    // Vetoed and hopeless hits never reach selection
    out.retain(|c| c.score > 0.0);
    rank_candidates(&mut out);
    out.truncate(config.top_k);
    out
}
