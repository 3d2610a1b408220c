use super::schema::SCHEMAS;
use super::{
    CONFLICT_CHECK, DISCUSSION, FUND_PROFILE, IcCode, PARTNER_ASSESSMENTS, PRIOR_ARTIFACTS,
    SCORE_DIMENSIONS, STARTUP_PROFILE,
};
use crate::is_calibrated_stage;
use chrono::NaiveDate;
use dossier_kernel::artifact::file_name;
use dossier_kernel::coerce::{
    as_dict, as_list, as_str, category, is_true, normalize_ws, number_or, objects, str_or, truthy,
};
use dossier_kernel::markdown::{bracket_list, display};
use dossier_kernel::{ArtifactState, Finding, Rule, RuleContext, check_integrity};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

pub const ZERO_APPLICABLE_MARKER: &str = "ZERO_APPLICABLE_DIMENSIONS";
pub const STALE_IMPORT_DAYS: i64 = 7;
pub const HIGH_NA_THRESHOLD: usize = 6;
pub const TOTAL_DIMENSIONS: usize = 28;
pub const MIN_CONVICTION_POINTS: usize = 2;
pub const MIN_KEY_CONCERNS: usize = 2;
pub const MIN_RATIONALE_CHARS: usize = 100;

/// Conviction-score range each score verdict must fall in.
pub const VERDICT_SCORE_RANGES: [(&str, f64, f64); 3] = [
    ("invest", 75.0, 100.0),
    ("more_diligence", 50.0, 74.9),
    ("pass", 0.0, 49.9),
];

const POSITIVE_VERDICTS: [&str; 2] = ["invest", "more_diligence"];
const NEGATIVE_VERDICTS: [&str; 2] = ["pass", "hard_pass"];

const SUB_AGENT_MODE: &str = "sub-agent";
const SEQUENTIAL_MODE: &str = "sequential";

type Out = Vec<Finding<IcCode>>;

pub static RULES: &[Rule<IcCode>] = &[
    Rule {
        id: "artifact_integrity",
        reads: &[
            STARTUP_PROFILE,
            FUND_PROFILE,
            CONFLICT_CHECK,
            DISCUSSION,
            SCORE_DIMENSIONS,
            PRIOR_ARTIFACTS,
            PARTNER_ASSESSMENTS[0],
            PARTNER_ASSESSMENTS[1],
            PARTNER_ASSESSMENTS[2],
        ],
        requires: &[],
        emits: &[IcCode::CorruptArtifact, IcCode::MissingArtifact],
        check: check_integrity::<IcCode>,
    },
    Rule {
        id: "blocking_conflict",
        reads: &[CONFLICT_CHECK],
        requires: &[CONFLICT_CHECK],
        emits: &[IcCode::BlockingConflict],
        check: check_blocking_conflict,
    },
    Rule {
        id: "orphaned_conflict",
        reads: &[CONFLICT_CHECK, FUND_PROFILE],
        requires: &[CONFLICT_CHECK, FUND_PROFILE],
        emits: &[IcCode::OrphanedConflict],
        check: check_orphaned_conflict,
    },
    Rule {
        id: "verdict_score_mismatch",
        reads: &[SCORE_DIMENSIONS],
        requires: &[SCORE_DIMENSIONS],
        emits: &[IcCode::VerdictScoreMismatch],
        check: check_verdict_score,
    },
    Rule {
        id: "consensus_score_mismatch",
        reads: &[DISCUSSION, SCORE_DIMENSIONS],
        requires: &[DISCUSSION, SCORE_DIMENSIONS],
        emits: &[IcCode::ConsensusScoreMismatch],
        check: check_consensus_score,
    },
    Rule {
        id: "unanimous_verdict_mismatch",
        reads: &[DISCUSSION],
        requires: &[DISCUSSION],
        emits: &[IcCode::UnanimousVerdictMismatch],
        check: check_unanimous_verdict,
    },
    Rule {
        id: "partner_agreement",
        reads: &[DISCUSSION],
        requires: &[DISCUSSION],
        emits: &[IcCode::PartnerUnanimity, IcCode::PartnerConvergence],
        check: check_partner_agreement,
    },
    Rule {
        id: "zero_applicable",
        reads: &[SCORE_DIMENSIONS],
        requires: &[SCORE_DIMENSIONS],
        emits: &[IcCode::ZeroApplicable],
        check: check_zero_applicable,
    },
    Rule {
        id: "stale_import",
        reads: &[PRIOR_ARTIFACTS],
        requires: &[PRIOR_ARTIFACTS],
        emits: &[IcCode::StaleImport],
        check: check_stale_import,
    },
    Rule {
        id: "low_evidence",
        reads: &[SCORE_DIMENSIONS],
        requires: &[SCORE_DIMENSIONS],
        emits: &[IcCode::LowEvidence],
        check: check_low_evidence,
    },
    Rule {
        id: "fund_validation_error",
        reads: &[FUND_PROFILE],
        requires: &[FUND_PROFILE],
        emits: &[IcCode::FundValidationError],
        check: check_fund_validation,
    },
    Rule {
        id: "degraded_assessment",
        reads: &[
            DISCUSSION,
            PARTNER_ASSESSMENTS[0],
            PARTNER_ASSESSMENTS[1],
            PARTNER_ASSESSMENTS[2],
        ],
        requires: &[DISCUSSION],
        emits: &[IcCode::DegradedAssessment],
        check: check_degraded_assessment,
    },
    Rule {
        id: "shallow_assessment",
        reads: &[
            DISCUSSION,
            PARTNER_ASSESSMENTS[0],
            PARTNER_ASSESSMENTS[1],
            PARTNER_ASSESSMENTS[2],
        ],
        requires: &[DISCUSSION],
        emits: &[IcCode::ShallowAssessment],
        check: check_shallow_assessment,
    },
    Rule {
        id: "high_na_count",
        reads: &[SCORE_DIMENSIONS],
        requires: &[SCORE_DIMENSIONS],
        emits: &[IcCode::HighNaCount],
        check: check_high_na_count,
    },
    Rule {
        id: "schema_drift",
        reads: &[
            STARTUP_PROFILE,
            FUND_PROFILE,
            CONFLICT_CHECK,
            DISCUSSION,
            SCORE_DIMENSIONS,
            PRIOR_ARTIFACTS,
        ],
        requires: &[],
        emits: &[IcCode::SchemaDrift],
        check: check_schema_drift,
    },
    Rule {
        id: "stage_out_of_scope",
        reads: &[STARTUP_PROFILE],
        requires: &[STARTUP_PROFILE],
        emits: &[IcCode::StageOutOfScope],
        check: check_stage_out_of_scope,
    },
    Rule {
        id: "sequential_fallback",
        reads: &[DISCUSSION],
        requires: &[DISCUSSION],
        emits: &[IcCode::SequentialFallback],
        check: check_sequential_fallback,
    },
];

fn legal_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r" (?:inc\.?|llc|ltd\.?|corp\.?)$").expect("legal suffix regex must compile")
    })
}

/// Company identity for cross-artifact matching: lowercase, one legal
/// suffix stripped, whitespace collapsed.
pub fn normalize_company(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    normalize_ws(&legal_suffix_re().replace(&lowered, ""))
}

fn score_summary<'a>(ctx: &RuleContext<'a>) -> &'a Map<String, Value> {
    as_dict(ctx.dict(SCORE_DIMENSIONS).get("summary"))
}

fn has_zero_applicable(summary: &Map<String, Value>) -> bool {
    as_list(summary.get("warnings"))
        .iter()
        .any(|w| w.as_str() == Some(ZERO_APPLICABLE_MARKER))
}

fn is_sub_agent_mode(discussion: &Map<String, Value>) -> bool {
    as_str(discussion.get("assessment_mode")) == Some(SUB_AGENT_MODE)
}

fn check_blocking_conflict(ctx: &RuleContext<'_>, out: &mut Out) {
    let summary = as_dict(ctx.dict(CONFLICT_CHECK).get("summary"));
    if is_true(summary.get("has_blocking_conflict")) {
        out.push(Finding::new(
            IcCode::BlockingConflict,
            "Portfolio has a blocking conflict — cannot proceed with investment",
        ));
    }
}

fn check_orphaned_conflict(ctx: &RuleContext<'_>, out: &mut Out) {
    let portfolio: Vec<String> = objects(ctx.dict(FUND_PROFILE).get("portfolio"))
        .map(|entry| normalize_company(str_or(entry.get("name"), "")))
        .collect();
    for conflict in objects(ctx.dict(CONFLICT_CHECK).get("conflicts")) {
        let company = conflict.get("company").map(display).unwrap_or_default();
        if !portfolio.contains(&normalize_company(&company)) {
            out.push(Finding::new(
                IcCode::OrphanedConflict,
                format!(
                    "Conflict company '{company}' not in fund_profile.portfolio \
                     — cross-artifact identity mismatch"
                ),
            ));
        }
    }
}

fn check_verdict_score(ctx: &RuleContext<'_>, out: &mut Out) {
    let summary = score_summary(ctx);
    if has_zero_applicable(summary) {
        return;
    }
    let verdict = category(summary.get("verdict"));
    let Some(&(_, low, high)) = VERDICT_SCORE_RANGES
        .iter()
        .find(|(name, _, _)| *name == verdict)
    else {
        return;
    };
    let score = number_or(summary.get("conviction_score"), 0.0);
    if !(low..=high).contains(&score) {
        let shown = summary
            .get("conviction_score")
            .filter(|v| v.is_number())
            .map(display)
            .unwrap_or_else(|| "0.0".to_string());
        out.push(Finding::new(
            IcCode::VerdictScoreMismatch,
            format!(
                "Verdict '{}' does not match score {shown}% (expected range: {low:.1}%-{high:.1}%)",
                display_or_empty(summary.get("verdict"))
            ),
        ));
    }
}

fn display_or_empty(value: Option<&Value>) -> String {
    value.map(display).unwrap_or_default()
}

fn check_consensus_score(ctx: &RuleContext<'_>, out: &mut Out) {
    let discussion = ctx.dict(DISCUSSION);
    let summary = score_summary(ctx);
    let consensus = category(discussion.get("consensus_verdict"));
    let scored = category(summary.get("verdict"));
    if !consensus.is_empty() && !scored.is_empty() && consensus != scored {
        out.push(Finding::new(
            IcCode::ConsensusScoreMismatch,
            format!(
                "Discussion consensus verdict '{}' differs from score verdict '{}' \
                 — review for consistency",
                display_or_empty(discussion.get("consensus_verdict")),
                display_or_empty(summary.get("verdict")),
            ),
        ));
    }
}

fn polarity(verdict: &str) -> Option<&'static str> {
    if POSITIVE_VERDICTS.contains(&verdict) {
        Some("positive")
    } else if NEGATIVE_VERDICTS.contains(&verdict) {
        Some("negative")
    } else {
        None
    }
}

fn check_unanimous_verdict(ctx: &RuleContext<'_>, out: &mut Out) {
    let discussion = ctx.dict(DISCUSSION);
    let partners: Vec<String> = objects(discussion.get("partner_verdicts"))
        .filter(|pv| truthy(pv.get("verdict")))
        .map(|pv| category(pv.get("verdict")))
        .collect();
    let Some(first) = partners.first() else {
        return;
    };
    let Some(partner_side) = polarity(first) else {
        return;
    };
    if !partners.iter().all(|v| polarity(v) == Some(partner_side)) {
        return;
    }
    let Some(consensus_side) = polarity(&category(discussion.get("consensus_verdict"))) else {
        return;
    };
    if consensus_side != partner_side {
        out.push(Finding::new(
            IcCode::UnanimousVerdictMismatch,
            format!(
                "All {} partners are {partner_side} but consensus is '{}' ({consensus_side}) \
                 — partner_verdicts or consensus_verdict likely not updated after debate",
                partners.len(),
                display_or_empty(discussion.get("consensus_verdict")),
            ),
        ));
    }
}

fn check_partner_agreement(ctx: &RuleContext<'_>, out: &mut Out) {
    let discussion = ctx.dict(DISCUSSION);
    let entries = as_list(discussion.get("partner_verdicts"));
    if entries.len() != 3 {
        return;
    }
    let partners: Vec<&Map<String, Value>> = entries.iter().map(|e| as_dict(Some(e))).collect();
    let verdicts: Vec<String> = partners.iter().map(|pv| category(pv.get("verdict"))).collect();
    if verdicts[0].is_empty() || verdicts.iter().any(|v| *v != verdicts[0]) {
        return;
    }

    let rationales: Vec<String> = partners
        .iter()
        .map(|pv| normalize_ws(str_or(pv.get("rationale"), "")))
        .collect();
    let has_identical = (0..rationales.len())
        .any(|i| (i + 1..rationales.len()).any(|j| rationales[i] == rationales[j]));

    if has_identical {
        out.push(Finding::new(
            IcCode::PartnerUnanimity,
            "All 3 partners agree on verdict AND share identical rationales \
             — flags generation collapse",
        ));
    } else if is_sub_agent_mode(discussion) {
        out.push(Finding::new(
            IcCode::PartnerConvergence,
            "All 3 partners independently converged on the same verdict with distinct rationales",
        ));
    }
}

fn check_zero_applicable(ctx: &RuleContext<'_>, out: &mut Out) {
    if has_zero_applicable(score_summary(ctx)) {
        out.push(Finding::new(
            IcCode::ZeroApplicable,
            "All dimensions marked not_applicable — score is 0.0",
        ));
    }
}

/// Date portion of an ISO-ish timestamp, if it parses.
fn leading_date(raw: &str) -> Option<NaiveDate> {
    let prefix: String = raw.chars().take(10).collect();
    NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").ok()
}

fn check_stale_import(ctx: &RuleContext<'_>, out: &mut Out) {
    for import in objects(ctx.dict(PRIOR_ARTIFACTS).get("imported")) {
        let raw = str_or(import.get("import_date"), "");
        let Some(date) = leading_date(raw) else {
            continue;
        };
        // Day granularity: an import dated seven days back is past the
        // window at any time of day on `as_of`.
        if (ctx.as_of - date).num_days() >= STALE_IMPORT_DAYS {
            out.push(Finding::new(
                IcCode::StaleImport,
                format!(
                    "Imported {} artifact from {raw} is older than 7 days",
                    str_or(import.get("source_skill"), "unknown")
                ),
            ));
        }
    }
}

fn is_not_applicable(item: &Map<String, Value>) -> bool {
    as_str(item.get("status")) == Some("not_applicable")
}

fn check_low_evidence(ctx: &RuleContext<'_>, out: &mut Out) {
    for item in objects(ctx.dict(SCORE_DIMENSIONS).get("items")) {
        if is_not_applicable(item) {
            continue;
        }
        let evidence = item.get("evidence");
        let blank = match evidence {
            Some(Value::String(s)) => s.trim().is_empty(),
            other => !truthy(other),
        };
        if blank {
            out.push(Finding::new(
                IcCode::LowEvidence,
                format!(
                    "Dimension '{}' has no evidence field",
                    item.get("id").map(display).unwrap_or_else(|| "?".to_string())
                ),
            ));
        }
    }
}

fn check_fund_validation(ctx: &RuleContext<'_>, out: &mut Out) {
    let validation = as_dict(ctx.dict(FUND_PROFILE).get("validation"));
    if as_str(validation.get("status")) == Some("valid") {
        return;
    }
    let errors: Vec<String> = as_list(validation.get("errors"))
        .iter()
        .take(3)
        .map(display)
        .collect();
    out.push(Finding::new(
        IcCode::FundValidationError,
        format!("Fund profile validation failed: {}", errors.join("; ")),
    ));
}

fn check_degraded_assessment(ctx: &RuleContext<'_>, out: &mut Out) {
    if !is_sub_agent_mode(ctx.dict(DISCUSSION)) {
        return;
    }
    for name in PARTNER_ASSESSMENTS {
        if matches!(ctx.artifacts.state(name), None | Some(ArtifactState::Missing)) {
            out.push(Finding::new(
                IcCode::DegradedAssessment,
                format!(
                    "Sub-agent mode but {} is missing — indicates sub-agent failure with silent fallback",
                    file_name(name)
                ),
            ));
        }
    }
}

fn check_shallow_assessment(ctx: &RuleContext<'_>, out: &mut Out) {
    if !is_sub_agent_mode(ctx.dict(DISCUSSION)) {
        return;
    }
    for name in PARTNER_ASSESSMENTS {
        let Some(assessment) = ctx.usable(name) else {
            continue;
        };
        let mut issues = Vec::new();
        if as_list(assessment.get("conviction_points")).len() < MIN_CONVICTION_POINTS {
            issues.push("conviction_points < 2");
        }
        if as_list(assessment.get("key_concerns")).len() < MIN_KEY_CONCERNS {
            issues.push("key_concerns < 2");
        }
        if str_or(assessment.get("rationale"), "").chars().count() < MIN_RATIONALE_CHARS {
            issues.push("rationale < 100 chars");
        }
        if !issues.is_empty() {
            out.push(Finding::new(
                IcCode::ShallowAssessment,
                format!("{}: {}", file_name(name), issues.join(", ")),
            ));
        }
    }
}

fn check_high_na_count(ctx: &RuleContext<'_>, out: &mut Out) {
    let na_count = objects(ctx.dict(SCORE_DIMENSIONS).get("items"))
        .filter(|item| is_not_applicable(item))
        .count();
    if na_count > HIGH_NA_THRESHOLD {
        out.push(Finding::new(
            IcCode::HighNaCount,
            format!(
                "{na_count} of {TOTAL_DIMENSIONS} dimensions marked not_applicable \
                 — conviction score may be inflated"
            ),
        ));
    }
}

fn check_schema_drift(ctx: &RuleContext<'_>, out: &mut Out) {
    for schema in SCHEMAS {
        let Some(artifact) = ctx.usable(schema.artifact) else {
            continue;
        };
        let extra = schema.unexpected(artifact.keys());
        if !extra.is_empty() {
            out.push(Finding::new(
                IcCode::SchemaDrift,
                format!(
                    "{} has unexpected top-level keys: {}",
                    file_name(schema.artifact),
                    bracket_list(&extra)
                ),
            ));
        }
        let missing = schema.missing(|key| artifact.contains_key(key));
        if !missing.is_empty() {
            out.push(Finding::new(
                IcCode::SchemaDrift,
                format!(
                    "{} missing required top-level keys: {}",
                    file_name(schema.artifact),
                    bracket_list(&missing)
                ),
            ));
        }
    }
}

fn check_stage_out_of_scope(ctx: &RuleContext<'_>, out: &mut Out) {
    let stage = category(ctx.dict(STARTUP_PROFILE).get("stage"));
    if !stage.is_empty() && !is_calibrated_stage(&stage) {
        out.push(Finding::new(
            IcCode::StageOutOfScope,
            format!(
                "Stage '{stage}' is outside calibrated range (pre_seed, seed, series_a). \
                 Results may be less precise."
            ),
        ));
    }
}

fn check_sequential_fallback(ctx: &RuleContext<'_>, out: &mut Out) {
    let discussion = ctx.dict(DISCUSSION);
    if as_str(discussion.get("assessment_mode")) == Some(SEQUENTIAL_MODE)
        && !truthy(discussion.get("assessment_mode_intentional"))
    {
        out.push(Finding::new(
            IcCode::SequentialFallback,
            "Assessments generated sequentially (no sub-agents) — not an error, just transparency",
        ));
    }
}
