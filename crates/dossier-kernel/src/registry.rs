//! Rule registry: an ordered, load-once table of independent consistency
//! rules.
//!
//! A pipeline builds its registry from a `static` slice of [`Rule`]s. The
//! slice order is the evaluation order and therefore the order findings
//! appear in the output.

use crate::artifact::{ArtifactSet, ArtifactState};
use crate::finding::{Finding, RuleCode};
use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

/// Everything a rule may read.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub artifacts: &'a ArtifactSet,
    /// Reference date for staleness checks.
    pub as_of: NaiveDate,
}

impl<'a> RuleContext<'a> {
    pub fn new(artifacts: &'a ArtifactSet, as_of: NaiveDate) -> Self {
        Self { artifacts, as_of }
    }

    pub fn usable(&self, name: &str) -> Option<&'a Map<String, Value>> {
        self.artifacts.usable(name)
    }

    /// The object of a present artifact, or an empty object.
    pub fn dict(&self, name: &str) -> &'a Map<String, Value> {
        self.artifacts.dict(name)
    }
}

pub type CheckFn<C> = fn(&RuleContext<'_>, &mut Vec<Finding<C>>);

/// One rule. `requires` lists the artifacts that must be present for the
/// rule to run; when any is not, the rule is skipped without findings.
pub struct Rule<C: 'static> {
    pub id: &'static str,
    pub reads: &'static [&'static str],
    pub requires: &'static [&'static str],
    pub emits: &'static [C],
    pub check: CheckFn<C>,
}

impl<C: RuleCode> Rule<C> {
    pub fn applies(&self, artifacts: &ArtifactSet) -> bool {
        self.requires.iter().all(|name| artifacts.is_usable(name))
    }
}

/// An ordered registry of rules for one pipeline.
pub struct RuleRegistry<C: 'static> {
    rules: &'static [Rule<C>],
}

impl<C: RuleCode> RuleRegistry<C> {
    pub const fn new(rules: &'static [Rule<C>]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [Rule<C>] {
        self.rules
    }

    /// Run every applicable rule in registration order.
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Finding<C>> {
        let mut findings = Vec::new();
        for rule in self.rules {
            if !rule.applies(ctx.artifacts) {
                tracing::debug!(rule = rule.id, "rule skipped: required artifact not usable");
                continue;
            }
            let before = findings.len();
            (rule.check)(ctx, &mut findings);
            debug_assert!(
                findings[before..]
                    .iter()
                    .all(|finding| rule.emits.contains(&finding.code)),
                "rule {} emitted an undeclared code",
                rule.id
            );
        }
        findings
    }

    /// Every code some rule declares it may emit.
    pub fn emitted_codes(&self) -> BTreeSet<C> {
        self.rules
            .iter()
            .flat_map(|rule| rule.emits.iter().copied())
            .collect()
    }

    pub fn rule(&self, id: &str) -> Option<&'static Rule<C>> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Inspectable form: rules in order, then the severity table.
    pub fn to_json(&self) -> Value {
        let rules: Vec<Value> = self
            .rules
            .iter()
            .map(|rule| {
                json!({
                    "id": rule.id,
                    "reads": rule.reads,
                    "requires": rule.requires,
                    "emits": rule.emits.iter().map(|code| code.as_str()).collect::<Vec<_>>(),
                })
            })
            .collect();
        let codes: Vec<Value> = C::ALL
            .iter()
            .map(|code| {
                json!({
                    "code": code.as_str(),
                    "severity": code.severity(),
                    "label": code.label(),
                    "acceptable": code.is_acceptable(),
                })
            })
            .collect();
        json!({ "rules": rules, "codes": codes })
    }
}

/// Integrity rule shared by every pipeline: one `CORRUPT_ARTIFACT` per
/// corrupt artifact and one `MISSING_ARTIFACT` per missing required one.
/// A corrupt artifact is never also reported missing.
pub fn check_integrity<C: RuleCode>(ctx: &RuleContext<'_>, out: &mut Vec<Finding<C>>) {
    for entry in ctx.artifacts.entries() {
        match &entry.state {
            ArtifactState::Corrupt { .. } => out.push(Finding::new(
                C::CORRUPT_ARTIFACT,
                format!("Artifact has invalid JSON: {}", entry.spec.file_name()),
            )),
            ArtifactState::Missing if entry.spec.required => out.push(Finding::new(
                C::MISSING_ARTIFACT,
                format!("Required artifact missing: {}", entry.spec.file_name()),
            )),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactSpec;
    use crate::finding::Severity;
    use serde_json::json;

    crate::rule_codes! {
        enum ToyCode {
            CorruptArtifact => ("CORRUPT_ARTIFACT", High, "Corrupt Artifact"),
            MissingArtifact => ("MISSING_ARTIFACT", High, "Missing Artifact"),
            TooMany => ("TOO_MANY", Medium, "Too Many"),
        }
    }

    fn check_too_many(ctx: &RuleContext<'_>, out: &mut Vec<Finding<ToyCode>>) {
        let count = crate::coerce::number_or(ctx.dict("counts").get("n"), 0.0);
        if count > 3.0 {
            out.push(Finding::new(ToyCode::TooMany, format!("{count} is too many")));
        }
    }

    static RULES: &[Rule<ToyCode>] = &[
        Rule {
            id: "integrity",
            reads: &["counts", "extras"],
            requires: &[],
            emits: &[ToyCode::CorruptArtifact, ToyCode::MissingArtifact],
            check: check_integrity::<ToyCode>,
        },
        Rule {
            id: "too_many",
            reads: &["counts"],
            requires: &["counts"],
            emits: &[ToyCode::TooMany],
            check: check_too_many,
        },
    ];

    fn ctx_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[test]
    fn rules_run_in_registration_order() {
        let set = ArtifactSet::from_states([
            (
                ArtifactSpec::required("counts"),
                ArtifactState::from_value(json!({"n": 5})),
            ),
            (ArtifactSpec::optional("extras"), ArtifactState::Missing),
        ]);
        let registry = RuleRegistry::new(RULES);
        let findings = registry.evaluate(&RuleContext::new(&set, ctx_date()));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, ToyCode::TooMany);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn rule_is_skipped_when_requirement_is_unusable() {
        let set = ArtifactSet::from_states([
            (
                ArtifactSpec::required("counts"),
                ArtifactState::Corrupt {
                    detail: "eof".into(),
                },
            ),
            (ArtifactSpec::optional("extras"), ArtifactState::Missing),
        ]);
        let findings = RuleRegistry::new(RULES).evaluate(&RuleContext::new(&set, ctx_date()));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, ToyCode::CorruptArtifact);
        assert_eq!(findings[0].message, "Artifact has invalid JSON: counts.json");
    }

    #[test]
    fn missing_required_artifact_is_reported_once() {
        let set = ArtifactSet::from_states([(ArtifactSpec::required("counts"), ArtifactState::Missing)]);
        let findings = RuleRegistry::new(RULES).evaluate(&RuleContext::new(&set, ctx_date()));
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].message, "Required artifact missing: counts.json");
    }

    #[test]
    fn registry_json_lists_rules_and_codes() {
        let registry = RuleRegistry::new(RULES);
        let value = registry.to_json();
        assert_eq!(value["rules"][1]["id"], "too_many");
        assert_eq!(value["rules"][1]["emits"], json!(["TOO_MANY"]));
        assert_eq!(value["codes"][2]["acceptable"], true);
        assert_eq!(registry.emitted_codes().len(), ToyCode::ALL.len());
        assert!(registry.rule("integrity").is_some());
    }

    #[test]
    fn severity_table_snapshot() {
        let value = RuleRegistry::new(RULES).to_json();
        insta::assert_json_snapshot!(value["codes"], @r#"
        [
          {
            "acceptable": false,
            "code": "CORRUPT_ARTIFACT",
            "label": "Corrupt Artifact",
            "severity": "high"
          },
          {
            "acceptable": false,
            "code": "MISSING_ARTIFACT",
            "label": "Missing Artifact",
            "severity": "high"
          },
          {
            "acceptable": true,
            "code": "TOO_MANY",
            "label": "Too Many",
            "severity": "medium"
          }
        ]
        "#);
    }
}
