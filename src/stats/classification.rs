//! Classification of a single replicate's serotype call against the
//! reference truth for its isolate.

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Sentinel used by SeqSero (and the reference panel) for "no serotype".
pub const NO_CALL: &str = "N/A";

/// Leading token of a call that SeqSero defers to manual review.
pub const DEFERRED_PREFIX: &str = "See";

/// A predicted serotype call for one replicate.
///
/// Every variant keeps the comma-separated pieces of the raw field as its candidate
/// names, so a truth listed in the field is found whatever the leading token says.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerotypeCall {
    /// No serotype could be predicted (`N/A`).
    Unresolved { candidates: BTreeSet<String> },
    /// The call was deferred to manual review (`See comments ...`). Keeps the raw text.
    Deferred {
        text: String,
        candidates: BTreeSet<String>,
    },
    /// One or more candidate serotype names; more than one means an ambiguous call.
    Called(BTreeSet<String>),
}

impl SerotypeCall {
    /// Parses the serotype column of a results table.
    ///
    /// Candidates are the raw comma-separated pieces, untrimmed. Returns `None` for a
    /// blank field, which carries no call at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let first_token = raw.split_whitespace().next()?;
        let candidates: BTreeSet<String> = raw
            .split(',')
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        let call = match first_token {
            NO_CALL => SerotypeCall::Unresolved { candidates },
            DEFERRED_PREFIX => SerotypeCall::Deferred {
                text: raw.trim().to_string(),
                candidates,
            },
            _ => SerotypeCall::Called(candidates),
        };
        Some(call)
    }

    pub fn candidates(&self) -> &BTreeSet<String> {
        match self {
            SerotypeCall::Unresolved { candidates } => candidates,
            SerotypeCall::Deferred { candidates, .. } => candidates,
            SerotypeCall::Called(names) => names,
        }
    }

    /// True if `serotype` is one of the candidate names of this call.
    pub fn contains(&self, serotype: &str) -> bool {
        self.candidates().contains(serotype)
    }
}

impl fmt::Display for SerotypeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerotypeCall::Unresolved { .. } => write!(f, "{}", NO_CALL),
            SerotypeCall::Deferred { text, .. } => write!(f, "{}", text),
            SerotypeCall::Called(names) => {
                let joined: Vec<&str> = names.iter().map(String::as_str).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

/// The known serotype of an isolate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Truth {
    /// The isolate has no true serotype (e.g. a negative control).
    Absent,
    Known(String),
}

impl Truth {
    /// Reads a reference value, mapping the `N/A` sentinel to `Absent`.
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        if value == NO_CALL {
            Truth::Absent
        } else {
            Truth::Known(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Truth::Absent => NO_CALL,
            Truth::Known(name) => name,
        }
    }
}

impl Serialize for Truth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for Truth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which calls count as a negative result for an isolate without a true serotype.
///
/// The summary and per-isolate tables have always disagreed on deferred calls, so
/// both rules are kept under their own names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegativeCallPolicy {
    /// Only `N/A` is negative; a deferred call is a false positive.
    UnresolvedOnly,
    /// Both `N/A` and deferred calls are negative.
    UnresolvedOrDeferred,
}

impl NegativeCallPolicy {
    fn is_negative(self, call: &SerotypeCall) -> bool {
        match (self, call) {
            (_, SerotypeCall::Unresolved { .. }) => true,
            (NegativeCallPolicy::UnresolvedOrDeferred, SerotypeCall::Deferred { .. }) => true,
            _ => false,
        }
    }
}

/// Confusion-matrix class of one replicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    TruePositive,
    TrueNegative,
    FalsePositive,
    FalseNegative,
}

/// Classifies a call against the isolate's truth.
///
/// For a known truth, candidate membership is checked before the call's kind, so a
/// listed truth is a true positive even in an `N/A` or `See ...` call.
pub fn classify(call: &SerotypeCall, truth: &Truth, policy: NegativeCallPolicy) -> Outcome {
    match truth {
        Truth::Absent => {
            if policy.is_negative(call) {
                Outcome::TrueNegative
            } else {
                Outcome::FalsePositive
            }
        }
        Truth::Known(serotype) => match call {
            call if call.contains(serotype) => Outcome::TruePositive,
            SerotypeCall::Unresolved { .. } | SerotypeCall::Deferred { .. } => {
                Outcome::FalseNegative
            }
            SerotypeCall::Called(_) => Outcome::FalsePositive,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn called(names: &[&str]) -> SerotypeCall {
        SerotypeCall::Called(names.iter().map(|n| n.to_string()).collect())
    }

    fn parsed(raw: &str) -> SerotypeCall {
        SerotypeCall::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_calls() {
        assert!(matches!(parsed("N/A"), SerotypeCall::Unresolved { .. }));
        assert!(matches!(
            parsed("N/A (O antigen missing)"),
            SerotypeCall::Unresolved { .. }
        ));
        match parsed("See comments below") {
            SerotypeCall::Deferred { text, candidates } => {
                assert_eq!(text, "See comments below");
                assert!(candidates.contains("See comments below"));
            }
            other => panic!("expected a deferred call, got {:?}", other),
        }
        assert_eq!(
            SerotypeCall::parse("Typhimurium,Lagos"),
            Some(called(&["Lagos", "Typhimurium"]))
        );
        assert_eq!(SerotypeCall::parse("Paratyphi A"), Some(called(&["Paratyphi A"])));
        assert_eq!(SerotypeCall::parse("   "), None);
        assert_eq!(SerotypeCall::parse(""), None);
    }

    #[test]
    fn test_truth_sentinel() {
        assert_eq!(Truth::parse("N/A"), Truth::Absent);
        assert_eq!(Truth::parse(" Newport "), Truth::Known("Newport".to_string()));
        assert_eq!(Truth::Absent.to_string(), "N/A");
    }

    #[test]
    fn test_classify_known_truth() {
        let truth = Truth::Known("Choleraesuis".to_string());
        for policy in [
            NegativeCallPolicy::UnresolvedOnly,
            NegativeCallPolicy::UnresolvedOrDeferred,
        ] {
            assert_eq!(
                classify(&called(&["Choleraesuis"]), &truth, policy),
                Outcome::TruePositive
            );
            // Extra ambiguous alternatives don't matter.
            assert_eq!(
                classify(&called(&["Choleraesuis", "Paratyphi C"]), &truth, policy),
                Outcome::TruePositive
            );
            assert_eq!(
                classify(&parsed("N/A"), &truth, policy),
                Outcome::FalseNegative
            );
            assert_eq!(
                classify(&parsed("See note"), &truth, policy),
                Outcome::FalseNegative
            );
            assert_eq!(
                classify(&called(&["Typhimurium"]), &truth, policy),
                Outcome::FalsePositive
            );
        }
    }

    #[test]
    fn test_classify_listed_truth_beats_call_kind() {
        let truth = Truth::Known("Typhimurium".to_string());
        for policy in [
            NegativeCallPolicy::UnresolvedOnly,
            NegativeCallPolicy::UnresolvedOrDeferred,
        ] {
            assert_eq!(
                classify(&parsed("See comments,Typhimurium"), &truth, policy),
                Outcome::TruePositive
            );
            assert_eq!(
                classify(&parsed("N/A or,Typhimurium"), &truth, policy),
                Outcome::TruePositive
            );
            assert_eq!(
                classify(&parsed("See comments,Lagos"), &truth, policy),
                Outcome::FalseNegative
            );
        }
    }

    #[test]
    fn test_candidates_are_not_trimmed() {
        let call = parsed("Typhimurium, Lagos");
        assert!(call.contains("Typhimurium"));
        assert!(call.contains(" Lagos"));
        assert!(!call.contains("Lagos"));
        assert_eq!(
            classify(&call, &Truth::Known("Lagos".to_string()), NegativeCallPolicy::UnresolvedOnly),
            Outcome::FalsePositive
        );
    }

    #[test]
    fn test_classify_absent_truth_policies() {
        let deferred = parsed("See note");

        assert_eq!(
            classify(&parsed("N/A"), &Truth::Absent, NegativeCallPolicy::UnresolvedOnly),
            Outcome::TrueNegative
        );
        assert_eq!(
            classify(&deferred, &Truth::Absent, NegativeCallPolicy::UnresolvedOnly),
            Outcome::FalsePositive
        );
        assert_eq!(
            classify(&deferred, &Truth::Absent, NegativeCallPolicy::UnresolvedOrDeferred),
            Outcome::TrueNegative
        );
        assert_eq!(
            classify(&called(&["Typhimurium"]), &Truth::Absent, NegativeCallPolicy::UnresolvedOrDeferred),
            Outcome::FalsePositive
        );
    }
}
