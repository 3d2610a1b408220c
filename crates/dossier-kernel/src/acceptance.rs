//! Acceptance directives: operator-authored overrides that acknowledge
//! known medium-severity findings.
//!
//! Directives live in the `accepted_warnings` array of one owner artifact
//! per pipeline. Resolution runs after every rule has fired and is the only
//! step that mutates a finding.

use crate::coerce::{as_list, non_empty_str};
use crate::finding::{Finding, RuleCode, Severity};
use serde_json::{Map, Value};

pub const ACCEPTED_WARNINGS_FIELD: &str = "accepted_warnings";

/// A validated directive: acknowledge findings of `code` whose message
/// contains `pattern`, case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceDirective<C> {
    pub code: C,
    pub pattern: String,
    pub reason: String,
}

/// Why a directive entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveRejection {
    #[error("accepted_warnings entry {index} is not an object — skipped")]
    NotAnObject { index: usize },

    #[error("accepted_warnings entry missing 'code' or 'match' — skipped")]
    MissingCodeOrMatch { index: usize },

    #[error("accepted_warnings entry for '{code}' missing 'reason' — skipped")]
    MissingReason { index: usize, code: String },

    #[error("accepted_warnings entry for unknown code '{code}' — ignored")]
    UnknownCode { index: usize, code: String },

    #[error("cannot accept {severity}-severity code '{code}' — ignored")]
    NotAcceptable {
        index: usize,
        code: String,
        severity: Severity,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDirectives<C> {
    pub accepted: Vec<AcceptanceDirective<C>>,
    pub rejected: Vec<DirectiveRejection>,
}

impl<C> Default for ParsedDirectives<C> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// Read directives from the owner artifact. Invalid entries are skipped
/// with a warning diagnostic and returned in `rejected`.
pub fn parse_directives<C: RuleCode>(owner: &Map<String, Value>) -> ParsedDirectives<C> {
    let mut parsed = ParsedDirectives::default();
    for (index, entry) in as_list(owner.get(ACCEPTED_WARNINGS_FIELD)).iter().enumerate() {
        match parse_entry::<C>(index, entry) {
            Ok(directive) => parsed.accepted.push(directive),
            Err(rejection) => {
                tracing::warn!("{rejection}");
                parsed.rejected.push(rejection);
            }
        }
    }
    parsed
}

fn parse_entry<C: RuleCode>(
    index: usize,
    entry: &Value,
) -> Result<AcceptanceDirective<C>, DirectiveRejection> {
    let Some(entry) = entry.as_object() else {
        return Err(DirectiveRejection::NotAnObject { index });
    };
    let (Some(raw_code), Some(pattern)) = (
        non_empty_str(entry.get("code")),
        non_empty_str(entry.get("match")),
    ) else {
        return Err(DirectiveRejection::MissingCodeOrMatch { index });
    };
    let Some(reason) = non_empty_str(entry.get("reason")) else {
        return Err(DirectiveRejection::MissingReason {
            index,
            code: raw_code.to_string(),
        });
    };
    let Some(code) = C::parse(raw_code) else {
        return Err(DirectiveRejection::UnknownCode {
            index,
            code: raw_code.to_string(),
        });
    };
    if !code.is_acceptable() {
        return Err(DirectiveRejection::NotAcceptable {
            index,
            code: raw_code.to_string(),
            severity: code.severity(),
        });
    }
    Ok(AcceptanceDirective {
        code,
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    })
}

/// Acknowledge matching medium findings in place and return how many
/// changed. The first matching directive wins; each finding is downgraded
/// at most once, so resolving twice changes nothing.
pub fn resolve<C: RuleCode>(findings: &mut [Finding<C>], directives: &[AcceptanceDirective<C>]) -> usize {
    let mut acknowledged = 0;
    for finding in findings.iter_mut() {
        if finding.severity != Severity::Medium {
            continue;
        }
        let message = finding.message.to_lowercase();
        let matched = directives.iter().find(|directive| {
            directive.code == finding.code && message.contains(&directive.pattern.to_lowercase())
        });
        if let Some(directive) = matched {
            finding.severity = Severity::Acknowledged;
            finding.message.push_str(&format!(" [Accepted: {}]", directive.reason));
            acknowledged += 1;
        }
    }
    acknowledged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    crate::rule_codes! {
        enum ToyCode {
            CorruptArtifact => ("CORRUPT_ARTIFACT", High, "Corrupt Artifact"),
            MissingArtifact => ("MISSING_ARTIFACT", High, "Missing Artifact"),
            StageMismatch => ("STAGE_MISMATCH", Medium, "Stage Mismatch"),
            OutOfScope => ("OUT_OF_SCOPE", Low, "Out of Scope"),
        }
    }

    fn owner(directives: Value) -> Map<String, Value> {
        json!({ "accepted_warnings": directives })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn invalid_entries_are_rejected_not_fatal() {
        let parsed = parse_directives::<ToyCode>(&owner(json!([
            "not an object",
            {"code": "STAGE_MISMATCH"},
            {"code": "STAGE_MISMATCH", "match": "seed", "reason": "   "},
            {"code": "NOPE", "match": "x", "reason": "y"},
            {"code": "MISSING_ARTIFACT", "match": "x", "reason": "y"},
            {"code": "OUT_OF_SCOPE", "match": "x", "reason": "y"},
            {"code": "STAGE_MISMATCH", "match": "Seed", "reason": "intentional"},
        ])));
        assert_eq!(parsed.accepted.len(), 1);
        assert_eq!(parsed.accepted[0].code, ToyCode::StageMismatch);
        assert_eq!(
            parsed.rejected,
            vec![
                DirectiveRejection::NotAnObject { index: 0 },
                DirectiveRejection::MissingCodeOrMatch { index: 1 },
                DirectiveRejection::MissingReason {
                    index: 2,
                    code: "STAGE_MISMATCH".into()
                },
                DirectiveRejection::UnknownCode {
                    index: 3,
                    code: "NOPE".into()
                },
                DirectiveRejection::NotAcceptable {
                    index: 4,
                    code: "MISSING_ARTIFACT".into(),
                    severity: Severity::High
                },
                DirectiveRejection::NotAcceptable {
                    index: 5,
                    code: "OUT_OF_SCOPE".into(),
                    severity: Severity::Low
                },
            ]
        );
        assert_eq!(
            parsed.rejected[4].to_string(),
            "cannot accept high-severity code 'MISSING_ARTIFACT' — ignored"
        );
    }

    #[test]
    fn non_list_accepted_warnings_yields_nothing() {
        let parsed = parse_directives::<ToyCode>(&owner(json!({"code": "STAGE_MISMATCH"})));
        assert!(parsed.accepted.is_empty());
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn resolve_acknowledges_case_insensitive_match() {
        let mut findings = vec![Finding::new(
            ToyCode::StageMismatch,
            "Deck claims 'seed' but analysis detected 'pre_seed'",
        )];
        let directives = vec![AcceptanceDirective {
            code: ToyCode::StageMismatch,
            pattern: "DECK CLAIMS 'SEED'".into(),
            reason: "intentional".into(),
        }];
        assert_eq!(resolve(&mut findings, &directives), 1);
        assert_eq!(findings[0].severity, Severity::Acknowledged);
        assert!(findings[0].message.ends_with(" [Accepted: intentional]"));
    }

    #[test]
    fn resolve_is_idempotent_and_first_match_wins() {
        let mut findings = vec![Finding::new(ToyCode::StageMismatch, "stage differs")];
        let directives = vec![
            AcceptanceDirective {
                code: ToyCode::StageMismatch,
                pattern: "stage".into(),
                reason: "first".into(),
            },
            AcceptanceDirective {
                code: ToyCode::StageMismatch,
                pattern: "differs".into(),
                reason: "second".into(),
            },
        ];
        resolve(&mut findings, &directives);
        let once = findings.clone();
        assert_eq!(resolve(&mut findings, &directives), 0);
        assert_eq!(findings, once);
        assert_eq!(findings[0].message, "stage differs [Accepted: first]");
    }

    #[test]
    fn resolve_never_touches_high_findings() {
        let mut findings = vec![Finding::new(
            ToyCode::MissingArtifact,
            "Required artifact missing: checklist.json",
        )];
        let directives = vec![AcceptanceDirective {
            code: ToyCode::MissingArtifact,
            pattern: "checklist".into(),
            reason: "forced".into(),
        }];
        assert_eq!(resolve(&mut findings, &directives), 0);
        assert_eq!(findings[0].severity, Severity::High);
    }
}
