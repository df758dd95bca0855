//! Query variant generation.
//!
//! One free-text name fans out into several alternate search strings:
//! abbreviation-expanded, stopword-simplified, class-marker-free, compact
//! token prefixes, an acronym, and any alias-table expansions keyed by the
//! simplified name. Variants are sanitized, deduplicated in order, and
//! capped; a non-empty input always yields at least one variant.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::{simplify_name, tokenize, unaccent, GENERIC_WORDS};

lazy_static! {
    static ref ABBREVIATIONS: HashMap<&'static str, &'static str> = [
        ("mfg", "manufacturing"),
        ("tech", "technology"),
        ("intl", "international"),
        ("int'l", "international"),
        ("grp", "group"),
        ("co", "company"),
        ("corp", "corporation"),
    ]
    .into_iter()
    .collect();

    static ref CLASS_MARKER_RE: Regex = Regex::new(r"\bclass[abc]\b").unwrap();
    static ref NON_ALNUM_RE: Regex = Regex::new(r"[^a-z0-9 ]+").unwrap();
    static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Expand known abbreviations token-by-token ("mfg" → "manufacturing").
pub fn expand_abbreviations(s: &str) -> String {
    tokenize(s)
        .iter()
        .map(|t| *ABBREVIATIONS.get(t.as_str()).unwrap_or(&t.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Acronym from token initials, kept only when it lands in the 3-8 letter
/// band where it could plausibly be a ticker-ish search term.
pub fn acronym(s: &str) -> String {
    let tokens = tokenize(s);
    if tokens.len() < 2 {
        return String::new();
    }
    let ac: String = tokens
        .iter()
        .filter_map(|t| t.chars().next())
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if (3..=8).contains(&ac.len()) {
        ac
    } else {
        String::new()
    }
}

/// Sanitize a derived query for the search APIs: fold, lowercase, collapse
/// punctuation and whitespace, and truncate over-long strings to their
/// first 8 tokens.
pub fn sanitize_query(q: &str) -> String {
    let q = unaccent(q).to_lowercase();
    let q = NON_ALNUM_RE.replace_all(&q, " ");
    let q = WS_RE.replace_all(q.trim(), " ").to_string();
    if q.len() > 48 {
        q.split_whitespace().take(8).collect::<Vec<_>>().join(" ")
    } else {
        q
    }
}

/// Drop a generic word from the tail, then the head, of a token list.
fn trim_generic_edges(mut tokens: Vec<String>) -> Vec<String> {
    if tokens
        .last()
        .is_some_and(|t| GENERIC_WORDS.contains(t.as_str()))
    {
        tokens.pop();
    }
    if tokens
        .first()
        .is_some_and(|t| GENERIC_WORDS.contains(t.as_str()))
    {
        tokens.remove(0);
    }
    tokens
}

/// Derive the ordered, deduplicated, capped variant list for a name.
///
/// `alias_expansions` maps simplified names to extra query terms
/// (e.g. "google" → ["alphabet"]); it applies regardless of whether local
/// candidate maps are enabled.
pub fn variants_for_name(
    name: &str,
    alias_expansions: &HashMap<String, Vec<String>>,
    max_variants: usize,
) -> Vec<String> {
    let raw = name.trim();
    let expanded = expand_abbreviations(raw);
    let simple = simplify_name(raw);
    let simple_noclass = WS_RE
        .replace_all(CLASS_MARKER_RE.replace_all(&simple, " ").trim(), " ")
        .to_string();

    let meaningful = trim_generic_edges(tokenize(raw));
    let compact3 = meaningful
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(" ");
    let head2: Vec<&String> = meaningful.iter().take(2).collect();
    let compact2 = if head2.len() >= 2 && !head2.iter().any(|t| GENERIC_WORDS.contains(t.as_str()))
    {
        head2
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        String::new()
    };

    let ac = acronym(raw);

    let mut variants: Vec<String> = Vec::new();
    for v in [
        expanded.as_str(),
        simple.as_str(),
        simple_noclass.as_str(),
        compact3.as_str(),
        compact2.as_str(),
        ac.as_str(),
    ] {
        let v = sanitize_query(v);
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    }

    if let Some(extras) = alias_expansions.get(&simple) {
        for extra in extras {
            let v = sanitize_query(extra);
            if !v.is_empty() && !variants.contains(&v) {
                variants.push(v);
            }
        }
    }

    if variants.is_empty() {
        let fallback = sanitize_query(raw);
        if !fallback.is_empty() {
            variants.push(fallback);
        }
    }

    variants.truncate(max_variants);
    variants
}
