//! Scored ticker-symbol candidates.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Asset classification carried on every candidate.
///
/// The engine only distinguishes the two kinds that change scoring and
/// selection behavior; everything a provider reports that is not an ETF
/// is treated as common stock.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AssetKind {
    /// Common stock (including ADRs and share classes).
    CommonStock,
    /// Exchange-traded fund or trust.
    Etf,
}

impl AssetKind {
    /// Map a provider-reported security type onto an asset kind.
    pub fn from_provider_type(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("etf") {
            Self::Etf
        } else {
            Self::CommonStock
        }
    }

    /// Stable display string, matching provider vocabulary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommonStock => "Common Stock",
            Self::Etf => "ETF",
        }
    }

    pub fn is_etf(&self) -> bool {
        matches!(self, Self::Etf)
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A scored, named, typed ticker-symbol hypothesis for an input name.
///
/// Candidates are immutable once constructed: every bias adjustment happens
/// before `Candidate::new` is called, and the score is rounded to two
/// decimals at construction so that equal inputs always rank identically.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candidate {
    /// Uppercase ticker symbol (e.g. "GOOG", "BRK.B", "SHOP.TO").
    pub symbol: String,

    /// Display name / description reported by the source.
    pub display_name: String,

    /// Asset classification.
    pub kind: AssetKind,

    /// Match confidence in [0.0, 1.0], rounded to two decimals.
    pub score: f64,

    /// Origin tag (e.g. "Finnhub", "Local", "Finnhub+USHyp").
    pub source: String,
}

impl Candidate {
    /// Build a candidate, normalizing the symbol to uppercase and rounding
    /// the score to two decimals.
    pub fn new(
        symbol: impl Into<String>,
        display_name: impl Into<String>,
        kind: AssetKind,
        score: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            display_name: display_name.into(),
            kind,
            score: round2(score),
            source: source.into(),
        }
    }

    /// Total order used everywhere candidates are ranked:
    /// descending score, then ascending symbol as the tie-break.
    pub fn ranking(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.symbol.cmp(&other.symbol))
    }
}

/// Round a score to two decimals.
pub fn round2(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

/// Sort candidates by descending score, ascending symbol.
pub fn rank_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| a.ranking(b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_from_provider_type() {
        assert_eq!(AssetKind::from_provider_type("ETF"), AssetKind::Etf);
        assert_eq!(AssetKind::from_provider_type("etf"), AssetKind::Etf);
        assert_eq!(
            AssetKind::from_provider_type("Common Stock"),
            AssetKind::CommonStock
        );
        assert_eq!(AssetKind::from_provider_type("ADR"), AssetKind::CommonStock);
        assert_eq!(AssetKind::from_provider_type(""), AssetKind::CommonStock);
    }

    #[test]
    fn test_candidate_new_normalizes() {
        let c = Candidate::new("goog ", "Alphabet Inc", AssetKind::CommonStock, 0.9349, "Finnhub");
        assert_eq!(c.symbol, "GOOG");
        assert_eq!(c.score, 0.93);
    }

    #[test]
    fn test_ranking_order() {
        let mut cands = vec![
            Candidate::new("MSFT", "Microsoft Corp", AssetKind::CommonStock, 0.80, "Finnhub"),
            Candidate::new("GOOGL", "Alphabet Inc Class A", AssetKind::CommonStock, 0.91, "Finnhub"),
            Candidate::new("GOOG", "Alphabet Inc Class C", AssetKind::CommonStock, 0.91, "Finnhub"),
        ];
        rank_candidates(&mut cands);
        let symbols: Vec<&str> = cands.iter().map(|c| c.symbol.as_str()).collect();
        // Equal scores tie-break by ascending symbol
        assert_eq!(symbols, vec!["GOOG", "GOOGL", "MSFT"]);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let a = vec![
            Candidate::new("B", "Beta", AssetKind::CommonStock, 0.50, "Local"),
            Candidate::new("A", "Alpha", AssetKind::CommonStock, 0.50, "Local"),
            Candidate::new("C", "Gamma", AssetKind::Etf, 0.70, "Local"),
        ];
        let mut first = a.clone();
        let mut second = a;
        second.reverse();
        rank_candidates(&mut first);
        rank_candidates(&mut second);
        let f: Vec<&str> = first.iter().map(|c| c.symbol.as_str()).collect();
        let s: Vec<&str> = second.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(f, s);
        assert_eq!(f, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.925), 0.93);
        assert_eq!(round2(0.9249), 0.92);
        assert_eq!(round2(1.0), 1.0);
    }
}
