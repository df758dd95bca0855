//! Fuzzy scoring and bias adjustment.
//!
//! The base score is a weighted blend of token-set overlap and character
//! sequence similarity on the simplified names. Domain bias rules then
//! adjust it: hard contradiction vetoes, a penalty band for weak matches,
//! share-class and asset-kind agreement bonuses, and a preference for
//! domestic-shaped listings. All adjustments happen before a candidate is
//! constructed; the final value is clamped to [0, 1].

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use super::{simplify_name, tokenize, GENERIC_WORDS, NON_US_SUFFIXES, STOPWORDS};
use crate::models::AssetKind;

lazy_static! {
    static ref US_TICKER_RE: Regex = Regex::new(r"^[A-Z]{1,5}$").unwrap();
    static ref CLASS_DOT_RE: Regex = Regex::new(r"^[A-Z]{1,5}\.[AB]$").unwrap();
    static ref OTC_RE: Regex = Regex::new(r"^[A-Z]{5}$").unwrap();
    static ref CLASS_C_NAME_RE: Regex = Regex::new(r"\bclass\s*c\b").unwrap();

    static ref BANK_WORDS: HashSet<&'static str> = [
        "bank", "banking", "financial", "finance", "wealth", "lending",
        "credit", "capital",
    ]
    .into_iter()
    .collect();

    static ref BREWING_WORDS: HashSet<&'static str> =
        ["brew", "brewer", "beer", "drinks"].into_iter().collect();
}

const CRUISE_PREFIXES: &[&str] = &["cruise", "cruises", "cruiseline", "cruiselines"];

const BOTTLER_PREFIXES: &[&str] = &["bottl", "bottler", "bottling", "embonor", "femsa", "hbc"];

/// Token-set Jaccard overlap between two names.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let sa: HashSet<String> = tokenize(a).into_iter().collect();
    let sb: HashSet<String> = tokenize(b).into_iter().collect();
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let inter = sa.intersection(&sb).count() as f64;
    let union = sa.union(&sb).count() as f64;
    inter / union
}

/// Base fuzzy similarity of two names, clamped to [0, 1].
///
/// Pure function of its two arguments: 0.62 × token-set Jaccard plus
/// 0.38 × normalized Levenshtein ratio of the simplified forms.
pub fn fuzzy_score(a: &str, b: &str) -> f64 {
    let ja = jaccard(a, b);
    let seq = strsim::normalized_levenshtein(&simplify_name(a), &simplify_name(b));
    (0.62 * ja + 0.38 * seq).clamp(0.0, 1.0)
}

fn any_prefix(tokens: &HashSet<String>, prefixes: &[&str]) -> bool {
    tokens
        .iter()
        .any(|t| prefixes.iter().any(|p| t.starts_with(p)))
}

/// Hard veto: the two names describe businesses that cannot be the same
/// issuer, or share no distinctive vocabulary at all.
pub fn has_contradiction(input_name: &str, candidate_name: &str) -> bool {
    let a: HashSet<String> = tokenize(input_name).into_iter().collect();
    let b: HashSet<String> = tokenize(candidate_name).into_iter().collect();

    if a.contains("bank")
        && (any_prefix(&b, CRUISE_PREFIXES)
            || b.iter().any(|t| BREWING_WORDS.contains(t.as_str())))
    {
        return true;
    }
    if a.contains("coca") && a.contains("cola") && any_prefix(&b, BOTTLER_PREFIXES) {
        return true;
    }

    let strong = |s: &HashSet<String>| -> HashSet<String> {
        s.iter()
            .filter(|t| !GENERIC_WORDS.contains(t.as_str()) && !STOPWORDS.contains(t.as_str()))
            .cloned()
            .collect()
    };
    let strong_in = strong(&a);
    let strong_cand = strong(&b);
    !strong_in.is_empty() && strong_in.is_disjoint(&strong_cand)
}

/// Scoring policy knobs shared by the adapters, the hypothesis synthesizer
/// and the local reference data.
#[derive(Clone, Copy, Debug)]
pub struct Scorer {
    /// Prefer domestic (US-shaped) listings.
    pub prefer_us_listings: bool,
    /// Count 5-letter OTC/ADR symbols ending in Y/F as domestic-shaped.
    pub prefer_otc: bool,
}

impl Scorer {
    /// Does this symbol look like a domestic listing: a plain 1-5 letter
    /// ticker, a `.A`/`.B` share class, or (when OTC is preferred) a
    /// 5-letter ADR/foreign-ordinary symbol ending in Y or F.
    pub fn is_domestic_symbol(&self, symbol: &str) -> bool {
        if symbol.is_empty() {
            return false;
        }
        if US_TICKER_RE.is_match(symbol) || CLASS_DOT_RE.is_match(symbol) {
            return true;
        }
        if self.prefer_otc && OTC_RE.is_match(symbol) {
            return symbol.ends_with('Y') || symbol.ends_with('F');
        }
        false
    }

    /// Apply the bias ladder to a base fuzzy score.
    ///
    /// Order matters: contradiction veto, bank-vocabulary mismatch,
    /// low-score penalty, share-class bonus, asset-kind agreement,
    /// domestic-listing preference, final clamp.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_biases(
        &self,
        symbol: &str,
        base_score: f64,
        simplified_input: &str,
        candidate_kind: AssetKind,
        expected_kind: AssetKind,
        input_name: &str,
        candidate_name: &str,
    ) -> f64 {
        let mut score = base_score;

        if has_contradiction(input_name, candidate_name) {
            return 0.0;
        }

        if tokenize(input_name).iter().any(|t| t == "bank") {
            let cand_tokens: HashSet<String> = tokenize(candidate_name).into_iter().collect();
            if !cand_tokens.iter().any(|t| BANK_WORDS.contains(t.as_str())) {
                score -= 0.60;
            }
        }

        if base_score < 0.40 {
            score -= 0.35;
            if base_score < 0.30 {
                return 0.0;
            }
        }

        if base_score >= 0.55 {
            if simplified_input.contains("classa") && symbol.ends_with(".A") {
                score += 0.06;
            }
            if simplified_input.contains("classb") && symbol.ends_with(".B") {
                score += 0.06;
            }
            if simplified_input.contains("classc")
                && CLASS_C_NAME_RE.is_match(&candidate_name.to_lowercase())
            {
                score += 0.06;
            }
        }

        score += if expected_kind.is_etf() == candidate_kind.is_etf() {
            0.12
        } else {
            -0.40
        };

        if self.prefer_us_listings && base_score >= 0.55 {
            if self.is_domestic_symbol(symbol) {
                score += 0.10;
            }
            for suffix in NON_US_SUFFIXES {
                if symbol.ends_with(suffix) {
                    score -= 0.20;
                    break;
                }
            }
            if symbol.contains('.') && !CLASS_DOT_RE.is_match(symbol) {
                score -= 0.35;
            }
        }

        score.clamp(0.0, 1.0)
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            prefer_us_listings: true,
            prefer_otc: true,
        }
    }
}
