//! Resolution outcomes.

use serde::{Deserialize, Serialize};

/// The outcome of applying the selection policy to a ranked candidate list.
///
/// `reason` names the rule that fired and, for acceptances, embeds the
/// winning score (e.g. `class_match:0.93`, `single_candidate:0.92`,
/// `top>=0.90:0.95`). Ambiguity and emptiness are ordinary outcomes, not
/// errors: `no_candidates`, `ambiguous`, `ambiguous_class_hint`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Resolution {
    /// The chosen symbol, if the policy accepted one.
    pub symbol: Option<String>,

    /// Reason code for the audit trail.
    pub reason: String,
}

impl Resolution {
    /// An accepted symbol with its reason code.
    pub fn accepted(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            reason: reason.into(),
        }
    }

    /// A rejection (no symbol chosen) with its reason code.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            symbol: None,
            reason: reason.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.symbol.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted() {
        let r = Resolution::accepted("WDGT", "single_candidate:0.92");
        assert!(r.is_resolved());
        assert_eq!(r.symbol.as_deref(), Some("WDGT"));
        assert_eq!(r.reason, "single_candidate:0.92");
    }

    #[test]
    fn test_rejected() {
        let r = Resolution::rejected("no_candidates");
        assert!(!r.is_resolved());
        assert!(r.symbol.is_none());
    }
}
