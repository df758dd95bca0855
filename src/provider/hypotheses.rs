//! Candidate hypothesis synthesis.
//!
//! Providers often return only a foreign listing or a single share class of
//! an issuer that also trades domestically. Two synthesis passes extend the
//! observed results: stripping a known foreign exchange suffix yields a
//! plausible domestic stem, and an `.A`/`.B` symbol implies its sibling
//! class. Hypotheses score slightly below their parent and run through the
//! same bias ladder before being kept.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::Candidate;
use crate::normalize::scoring::Scorer;
use crate::normalize::{simplify_name, NON_US_SUFFIXES};

lazy_static! {
    static ref CLASS_SYMBOL_RE: Regex = Regex::new(r"^([A-Z]{1,5})\.([AB])$").unwrap();
    static ref OTC_YF_RE: Regex = Regex::new(r"^[A-Z]{5}$").unwrap();
}

/// Haircut applied to a domestic-stem hypothesis relative to its parent.
const DOMESTIC_HYPOTHESIS_PENALTY: f64 = 0.02;

/// Haircut applied to a sibling share-class hypothesis.
const CLASS_HYPOTHESIS_PENALTY: f64 = 0.03;

/// Best candidate per symbol, keeping the highest score seen.
fn best_by_symbol(candidates: Vec<Candidate>) -> HashMap<String, Candidate> {
    let mut best: HashMap<String, Candidate> = HashMap::new();
    for c in candidates {
        match best.get(&c.symbol) {
            Some(existing) if existing.score >= c.score => {}
            _ => {
                best.insert(c.symbol.clone(), c);
            }
        }
    }
    best
}

/// For each foreign-suffixed symbol, hypothesize the suffix-stripped stem as
/// an unlisted domestic ticker.
pub fn add_domestic_hypotheses(candidates: Vec<Candidate>, scorer: &Scorer) -> Vec<Candidate> {
    let best = best_by_symbol(candidates);
    let mut extended = best.clone();

    for c in best.values() {
        if CLASS_SYMBOL_RE.is_match(&c.symbol) {
            continue;
        }
        if OTC_YF_RE.is_match(&c.symbol) && (c.symbol.ends_with('Y') || c.symbol.ends_with('F')) {
            continue;
        }
        for suffix in NON_US_SUFFIXES {
            if let Some(stem) = c.symbol.strip_suffix(suffix) {
                if !stem.is_empty()
                    && scorer.is_domestic_symbol(stem)
                    && !extended.contains_key(stem)
                {
                    let adjusted = scorer.apply_biases(
                        stem,
                        c.score - DOMESTIC_HYPOTHESIS_PENALTY,
                        &simplify_name(&c.display_name),
                        c.kind,
                        c.kind,
                        &c.display_name,
                        &c.display_name,
                    );
                    extended.insert(
                        stem.to_string(),
                        Candidate::new(
                            stem,
                            c.display_name.clone(),
                            c.kind,
                            adjusted,
                            format!("{}+USHyp", c.source),
                        ),
                    );
                }
                break;
            }
        }
    }

    extended.into_values().collect()
}

/// For each `.A`/`.B` symbol, hypothesize the sibling share class.
pub fn add_share_class_hypotheses(candidates: Vec<Candidate>, scorer: &Scorer) -> Vec<Candidate> {
    let best = best_by_symbol(candidates);
    let mut extended = best.clone();

    for c in best.values() {
        let Some(caps) = CLASS_SYMBOL_RE.captures(&c.symbol) else {
            continue;
        };
        let stem = caps.get(1).unwrap().as_str();
        let sibling = match caps.get(2).unwrap().as_str() {
            "A" => format!("{}.B", stem),
            _ => format!("{}.A", stem),
        };
        if extended.contains_key(&sibling) {
            continue;
        }
        let adjusted = scorer.apply_biases(
            &sibling,
            c.score - CLASS_HYPOTHESIS_PENALTY,
            &simplify_name(&c.display_name),
            c.kind,
            c.kind,
            &c.display_name,
            &c.display_name,
        );
        extended.insert(
            sibling.clone(),
            Candidate::new(
                sibling,
                c.display_name.clone(),
                c.kind,
                adjusted,
                format!("{}+ClassHyp", c.source),
            ),
        );
    }

    extended.into_values().collect()
}
