//! Name normalization.
//!
//! Everything downstream of the provider adapters works on normalized
//! token streams: diacritics folded away, lowercased, punctuation
//! collapsed, corporate filler removed. Share-class markers survive
//! stopword removal by fusing "class a/b/c" into a single `classa`/
//! `classb`/`classc` token.

pub mod scoring;
pub mod variants;

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::models::AssetKind;

lazy_static! {
    /// Corporate suffixes and filler words removed by [`simplify_name`].
    pub static ref STOPWORDS: HashSet<&'static str> = [
        "inc", "inc.", "corporation", "corp", "co", "company", "plc", "sa",
        "nv", "ag", "se", "the", "ltd", "limited", "holdings", "holding",
        "group", "class",
    ]
    .into_iter()
    .collect();

    /// Words too common to distinguish one issuer from another.
    pub static ref GENERIC_WORDS: HashSet<&'static str> = [
        "bank", "group", "holdings", "holding", "plc", "company",
        "corporation", "sa", "nv", "ag", "se",
    ]
    .into_iter()
    .collect();

    static ref FAMILY_STRUCTURE_RE: Regex =
        Regex::new(r"\b(sp|spon|sponsored|adr|ads|pref|preferred|share|shares)\b").unwrap();
    static ref FAMILY_CLASS_RE: Regex = Regex::new(r"\b(classa|classb|classc)\b").unwrap();
    static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Exchange suffixes that mark a listing as non-domestic.
pub const NON_US_SUFFIXES: &[&str] = &[
    ".TO", ".V", ".SA", ".L", ".AS", ".PA", ".SW", ".F", ".DE", ".HK", ".SS", ".SZ", ".AX", ".NZ",
    ".BK", ".TW", ".T", ".KL", ".IS", ".ME", ".MI", ".MC", ".VI", ".SG", ".JK", ".KS", ".KQ",
    ".SR", ".CR", ".NE", ".NS", ".BO",
];

/// Fold diacritics to their ASCII base characters, dropping anything that
/// does not decompose to ASCII.
pub fn unaccent(s: &str) -> String {
    s.nfkd().filter(|c| c.is_ascii()).collect()
}

/// Lowercase, fold diacritics, replace non-alphanumerics with spaces and
/// split on whitespace.
pub fn tokenize(s: &str) -> Vec<String> {
    let folded = unaccent(s).to_lowercase();
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Remove stopwords, fusing "class" + single letter a/b/c into one token so
/// the share-class signal survives.
pub fn simplify_name(name: &str) -> String {
    let tokens = tokenize(name);
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        if STOPWORDS.contains(t.as_str()) {
            if t == "class" {
                if let Some(next) = tokens.get(i + 1) {
                    if matches!(next.as_str(), "a" | "b" | "c") {
                        out.push(format!("class{}", next));
                        i += 2;
                        continue;
                    }
                }
            }
            i += 1;
            continue;
        }
        out.push(t.clone());
        i += 1;
    }
    out.join(" ")
}

/// Normalized company identity used to collapse multi-listing duplicates of
/// one issuer: the simplified name with share-class, ADR and preferred-share
/// structure tokens stripped.
pub fn company_family_key(desc: &str) -> String {
    let s = simplify_name(desc);
    let s = FAMILY_STRUCTURE_RE.replace_all(&s, " ");
    let s = FAMILY_CLASS_RE.replace_all(&s, " ");
    WS_RE.replace_all(s.trim(), " ").to_string()
}

/// A name is "generic" when it is composed entirely of common/non-distinctive
/// words ("Bank Holdings"). Generic names require a higher acceptance
/// threshold in the selection policy.
pub fn is_generic_name(name: &str) -> bool {
    let tokens = tokenize(name);
    !tokens.is_empty()
        && tokens
            .iter()
            .all(|t| GENERIC_WORDS.contains(t.as_str()) || STOPWORDS.contains(t.as_str()))
}

/// Infer the asset kind the input name is asking for: ETF when the name
/// carries fund vocabulary, common stock otherwise.
pub fn expected_kind(name: &str) -> AssetKind {
    let tokens = tokenize(name);
    let has = |w: &str| tokens.iter().any(|t| t == w);
    if has("etf") || has("trust") || has("fund") {
        AssetKind::Etf
    } else {
        AssetKind::CommonStock
    }
}

/// Share-class hint encoded in a simplified name, if any.
pub fn class_hint(simplified: &str) -> Option<char> {
    for (marker, hint) in [("classa", 'a'), ("classb", 'b'), ("classc", 'c')] {
        if simplified.split_whitespace().any(|t| t == marker) {
            return Some(hint);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unaccent() {
        assert_eq!(unaccent("Nestlé"), "Nestle");
        assert_eq!(unaccent("Société Générale"), "Societe Generale");
        assert_eq!(unaccent("plain"), "plain");
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("Alphabet Inc. Class C"),
            vec!["alphabet", "inc", "class", "c"]
        );
        assert_eq!(tokenize("AT&T Inc"), vec!["at", "t", "inc"]);
        assert!(tokenize("  --  ").is_empty());
    }

    #[test]
    fn test_simplify_fuses_share_class() {
        assert_eq!(simplify_name("Alphabet Inc Class C"), "alphabet classc");
        assert_eq!(
            simplify_name("Berkshire Hathaway Inc Class B"),
            "berkshire hathaway classb"
        );
        // "class" with no letter after it just drops
        assert_eq!(simplify_name("First Class Shipping"), "first shipping");
    }

    #[test]
    fn test_simplify_removes_stopwords() {
        assert_eq!(simplify_name("The Coca-Cola Company"), "coca cola");
        assert_eq!(simplify_name("Toyota Motor Corp"), "toyota motor");
    }

    #[test]
    fn test_family_key_strips_structure() {
        assert_eq!(
            company_family_key("Alphabet Inc Class A"),
            company_family_key("Alphabet Inc Class C")
        );
        assert_eq!(company_family_key("Sony Group Sponsored ADR"), "sony");
        assert_eq!(
            company_family_key("Roche Holding AG Preferred Shares"),
            "roche"
        );
    }

    #[test]
    fn test_is_generic_name() {
        assert!(is_generic_name("Bank Holdings"));
        assert!(is_generic_name("The Company"));
        assert!(!is_generic_name("Acme Bank Holdings"));
        assert!(!is_generic_name("Alphabet Inc"));
        assert!(!is_generic_name(""));
    }

    #[test]
    fn test_expected_kind() {
        assert_eq!(expected_kind("Vanguard S&P 500 ETF"), AssetKind::Etf);
        assert_eq!(expected_kind("SPDR Gold Trust"), AssetKind::Etf);
        assert_eq!(expected_kind("Alphabet Inc"), AssetKind::CommonStock);
    }

    #[test]
    fn test_class_hint() {
        assert_eq!(class_hint(&simplify_name("Alphabet Inc Class C")), Some('c'));
        assert_eq!(class_hint(&simplify_name("Berkshire Hathaway Class B")), Some('b'));
        assert_eq!(class_hint(&simplify_name("Apple Inc")), None);
    }
}
