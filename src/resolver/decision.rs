//! Symbol selection policy.
//!
//! Given a name and its ranked candidates, pick one symbol or report why
//! none was picked. Rules fire in order: share-class hints (with a hard
//! rule for Alphabet's C/A classes), the Berkshire `.B` default, the
//! single-candidate acceptance, then plain thresholding - 0.90 for
//! ordinary names, 0.96 for names made entirely of generic words. Every
//! acceptance is written through to the durable store.

use lazy_static::lazy_static;
use regex::Regex;

use super::store::ResolutionStore;
use crate::models::{Candidate, Resolution};
use crate::normalize::{class_hint, is_generic_name, simplify_name, tokenize};

lazy_static! {
    static ref CLASS_A_NAME_RE: Regex = Regex::new(r"\bclass\s*a\b").unwrap();
    static ref CLASS_B_NAME_RE: Regex = Regex::new(r"\bclass\s*b\b").unwrap();
    static ref CLASS_C_NAME_RE: Regex = Regex::new(r"\bclass\s*c\b").unwrap();
}

/// Acceptance threshold for ordinary names.
const ACCEPT_SCORE: f64 = 0.90;

/// Acceptance threshold for generic names ("Bank Holdings").
const ACCEPT_SCORE_GENERIC: f64 = 0.96;

/// Does this candidate encode the hinted share class, either through its
/// symbol suffix or its display name? Alphabet gets a hard rule: class C
/// is GOOG and only GOOG, class A only GOOGL.
fn encodes_class(symbol: &str, display_name: &str, hint: char, input_has_alphabet: bool) -> bool {
    let lower_name = display_name.to_lowercase();
    if input_has_alphabet {
        if hint == 'c' {
            return symbol == "GOOG";
        }
        if hint == 'a' {
            return symbol == "GOOGL";
        }
    }
    match hint {
        'a' => symbol.ends_with(".A") || CLASS_A_NAME_RE.is_match(&lower_name),
        'b' => symbol.ends_with(".B") || CLASS_B_NAME_RE.is_match(&lower_name),
        'c' => CLASS_C_NAME_RE.is_match(&lower_name),
        _ => false,
    }
}

/// Apply the selection policy. See module docs for rule order.
pub fn choose_symbol(name: &str, candidates: &[Candidate], store: &ResolutionStore) -> Resolution {
    if candidates.is_empty() {
        return Resolution::rejected("no_candidates");
    }

    // Defensive: callers hand us ranked lists, but the policy's guarantees
    // are stated over score order.
    let mut cands: Vec<&Candidate> = candidates.iter().collect();
    cands.sort_by(|a, b| a.ranking(b));

    let simplified = simplify_name(name);
    let input_has_alphabet = tokenize(name).iter().any(|t| t == "alphabet");

    if let Some(hint) = class_hint(&simplified) {
        let matches: Vec<&&Candidate> = cands
            .iter()
            .filter(|c| encodes_class(&c.symbol, &c.display_name, hint, input_has_alphabet))
            .collect();
        return match matches.len() {
            0 => Resolution::rejected("ambiguous_class_hint"),
            1 => {
                let c = matches[0];
                store.put(name, &c.symbol);
                Resolution::accepted(&c.symbol, format!("class_match:{:.2}", c.score))
            }
            _ => {
                let c = matches[0];
                store.put(name, &c.symbol);
                Resolution::accepted(&c.symbol, format!("class_match_top:{:.2}", c.score))
            }
        };
    }

    if simplified.split_whitespace().any(|t| t == "berkshire") {
        if let Some(c) = cands.iter().find(|c| c.symbol.ends_with(".B")) {
            store.put(name, &c.symbol);
            return Resolution::accepted(&c.symbol, format!("berkshire_default_B:{:.2}", c.score));
        }
    }

    if cands.len() == 1 {
        let c = cands[0];
        store.put(name, &c.symbol);
        return Resolution::accepted(&c.symbol, format!("single_candidate:{:.2}", c.score));
    }

    let generic = is_generic_name(name);
    let threshold = if generic {
        ACCEPT_SCORE_GENERIC
    } else {
        ACCEPT_SCORE
    };
    let top = cands[0];
    if top.score >= threshold {
        store.put(name, &top.symbol);
        let mut reason = format!("top>={:.2}:{:.2}", threshold, top.score);
        if generic {
            reason.push_str(":generic_name");
        }
        return Resolution::accepted(&top.symbol, reason);
    }

    if generic {
        Resolution::rejected("ambiguous:generic_name")
    } else {
        Resolution::rejected("ambiguous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetKind;
    use tempfile::tempdir;

    fn cand(symbol: &str, name: &str, score: f64) -> Candidate {
        Candidate::new(symbol, name, AssetKind::CommonStock, score, "Finnhub")
    }

    fn open_store(dir: &tempfile::TempDir) -> ResolutionStore {
        ResolutionStore::open(dir.path(), true, true, false)
    }

    #[test]
    fn test_no_candidates() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let r = choose_symbol("Anything", &[], &store);
        assert!(!r.is_resolved());
        assert_eq!(r.reason, "no_candidates");
    }

    #[test]
    fn test_alphabet_class_c_hard_rule() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![
            cand("GOOG", "Alphabet Inc Class C", 0.93),
            cand("GOOGL", "Alphabet Inc Class A", 0.91),
        ];
        let r = choose_symbol("Alphabet Inc Class C", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("GOOG"));
        assert_eq!(r.reason, "class_match:0.93");
        assert_eq!(store.get("Alphabet Inc Class C").as_deref(), Some("GOOG"));
    }

    #[test]
    fn test_alphabet_class_a_hard_rule() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![
            cand("GOOG", "Alphabet Inc Class C", 0.93),
            cand("GOOGL", "Alphabet Inc Class A", 0.91),
        ];
        let r = choose_symbol("Alphabet Inc Class A", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("GOOGL"));
        assert_eq!(r.reason, "class_match:0.91");
    }

    #[test]
    fn test_class_hint_by_symbol_suffix() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![
            cand("BRK.B", "Berkshire Hathaway Inc", 0.92),
            cand("BRKA", "Berkshire Something Else", 0.80),
        ];
        let r = choose_symbol("Berkshire Hathaway Class B", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("BRK.B"));
        assert!(r.reason.starts_with("class_match:"));
    }

    #[test]
    fn test_class_hint_multiple_matches_takes_top() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![
            cand("XYZ.A", "Xyz Corp Class A", 0.88),
            cand("ABC.A", "Abc Corp Class A", 0.85),
        ];
        let r = choose_symbol("Xyz Corp Class A", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("XYZ.A"));
        assert_eq!(r.reason, "class_match_top:0.88");
    }

    #[test]
    fn test_class_hint_no_match_is_ambiguous() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![cand("XYZ", "Xyz Corp", 0.95)];
        let r = choose_symbol("Xyz Corp Class C", &cands, &store);
        assert!(!r.is_resolved());
        assert_eq!(r.reason, "ambiguous_class_hint");
        assert!(store.is_empty());
    }

    #[test]
    fn test_berkshire_defaults_to_class_b() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![
            cand("BRK.A", "Berkshire Hathaway Inc", 0.94),
            cand("BRK.B", "Berkshire Hathaway Inc", 0.92),
        ];
        let r = choose_symbol("Berkshire Hathaway", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("BRK.B"));
        assert_eq!(r.reason, "berkshire_default_B:0.92");
    }

    #[test]
    fn test_single_candidate_accepted_outright() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![cand("WDGT", "Widget Corporation", 0.92)];
        let r = choose_symbol("Widget Corp", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("WDGT"));
        assert_eq!(r.reason, "single_candidate:0.92");
        // Accepted mapping persisted under the simplified name
        assert_eq!(store.get("Widget Corp").as_deref(), Some("WDGT"));
    }

    #[test]
    fn test_single_low_candidate_still_accepted() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![cand("WDGT", "Widget Corporation", 0.40)];
        let r = choose_symbol("Widget Corp", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("WDGT"));
        assert_eq!(r.reason, "single_candidate:0.40");
    }

    #[test]
    fn test_threshold_acceptance() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![
            cand("AAPL", "Apple Inc", 0.95),
            cand("APLE", "Apple Hospitality REIT", 0.60),
        ];
        let r = choose_symbol("Apple Inc", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("AAPL"));
        assert_eq!(r.reason, "top>=0.90:0.95");
    }

    #[test]
    fn test_below_threshold_is_ambiguous() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![
            cand("AAA", "Aardvark Holdings", 0.85),
            cand("BBB", "Aardvark Industries", 0.83),
        ];
        let r = choose_symbol("Aardvark", &cands, &store);
        assert!(!r.is_resolved());
        assert_eq!(r.reason, "ambiguous");
        assert!(store.is_empty());
    }

    #[test]
    fn test_generic_name_needs_higher_threshold() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![
            cand("BKH", "Bank Holdings Corp", 0.92),
            cand("BKHX", "Bank Holdings Group", 0.80),
        ];
        // 0.92 clears the ordinary bar but not the generic one
        let r = choose_symbol("Bank Holdings", &cands, &store);
        assert!(!r.is_resolved());
        assert_eq!(r.reason, "ambiguous:generic_name");

        let cands = vec![
            cand("BKH", "Bank Holdings Corp", 0.97),
            cand("BKHX", "Bank Holdings Group", 0.80),
        ];
        let r = choose_symbol("Bank Holdings", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("BKH"));
        assert_eq!(r.reason, "top>=0.96:0.97:generic_name");
    }

    #[test]
    fn test_unsorted_input_is_resorted() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let cands = vec![
            cand("APLE", "Apple Hospitality REIT", 0.60),
            cand("AAPL", "Apple Inc", 0.95),
        ];
        let r = choose_symbol("Apple Inc", &cands, &store);
        assert_eq!(r.symbol.as_deref(), Some("AAPL"));
    }
}
