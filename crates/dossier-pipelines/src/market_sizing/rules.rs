use super::provenance::Provenance;
use super::{
    ARTIFACTS, CHECKLIST, INPUTS, METHODOLOGY, SENSITIVITY, SIZING, SizingCode, VALIDATION,
    is_quantitative, param_label,
};
use dossier_kernel::artifact::file_name;
use dossier_kernel::coerce::{as_dict, as_list, as_str, number_or, objects, truthy};
use dossier_kernel::markdown::{bracket_list, display, fmt_usd, text};
use dossier_kernel::{ArtifactState, Finding, Rule, RuleContext, check_integrity};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

pub const EXPECTED_CHECKLIST_ITEMS: usize = 22;
pub const MAX_NOT_APPLICABLE: f64 = 7.0;
pub const MIN_SCENARIOS: usize = 3;
pub const MIN_ESTIMATE_RANGE_PCT: f64 = 50.0;
pub const MIN_VALIDATING_SOURCES: f64 = 2.0;
pub const TAM_DISCREPANCY_PCT: f64 = 30.0;

const AGENT_ESTIMATE: &str = "agent_estimate";

type Out = Vec<Finding<SizingCode>>;

pub static RULES: &[Rule<SizingCode>] = &[
    Rule {
        id: "artifact_integrity",
        reads: &[INPUTS, METHODOLOGY, VALIDATION, SIZING, CHECKLIST, SENSITIVITY],
        requires: &[],
        emits: &[SizingCode::CorruptArtifact, SizingCode::MissingArtifact],
        check: check_integrity::<SizingCode>,
    },
    Rule {
        id: "missing_optional_artifact",
        reads: &[SENSITIVITY],
        requires: &[],
        emits: &[SizingCode::MissingOptionalArtifact],
        check: check_missing_optional,
    },
    Rule {
        id: "unsourced_assumptions",
        reads: &[VALIDATION, SENSITIVITY],
        requires: &[VALIDATION],
        emits: &[SizingCode::UnsourcedAssumptions],
        check: check_unsourced_assumptions,
    },
    Rule {
        id: "unvalidated_claims",
        reads: &[VALIDATION],
        requires: &[VALIDATION],
        emits: &[SizingCode::UnvalidatedClaims],
        check: check_unvalidated_claims,
    },
    Rule {
        id: "refuted_claims",
        reads: &[VALIDATION],
        requires: &[VALIDATION],
        emits: &[SizingCode::RefutedMissingReason, SizingCode::RefutedClaims],
        check: check_refuted_claims,
    },
    Rule {
        id: "approach_mismatch",
        reads: &[METHODOLOGY, SIZING],
        requires: &[METHODOLOGY, SIZING],
        emits: &[SizingCode::ApproachMismatch],
        check: check_approach_mismatch,
    },
    Rule {
        id: "tam_discrepancy",
        reads: &[SIZING],
        requires: &[SIZING],
        emits: &[SizingCode::TamDiscrepancy],
        check: check_tam_discrepancy,
    },
    Rule {
        id: "checklist_failures",
        reads: &[CHECKLIST],
        requires: &[CHECKLIST],
        emits: &[SizingCode::ChecklistFailures],
        check: check_checklist_failures,
    },
    Rule {
        id: "checklist_incomplete",
        reads: &[CHECKLIST],
        requires: &[CHECKLIST],
        emits: &[SizingCode::ChecklistIncomplete],
        check: check_checklist_incomplete,
    },
    Rule {
        id: "low_checklist_coverage",
        reads: &[CHECKLIST],
        requires: &[CHECKLIST],
        emits: &[SizingCode::LowChecklistCoverage],
        check: check_checklist_coverage,
    },
    Rule {
        id: "few_sensitivity_params",
        reads: &[SENSITIVITY],
        requires: &[SENSITIVITY],
        emits: &[SizingCode::FewSensitivityParams],
        check: check_few_sensitivity_params,
    },
    Rule {
        id: "narrow_agent_estimate_range",
        reads: &[SENSITIVITY],
        requires: &[SENSITIVITY],
        emits: &[SizingCode::NarrowAgentEstimateRange],
        check: check_narrow_ranges,
    },
    Rule {
        id: "overclaimed_validation",
        reads: &[VALIDATION],
        requires: &[VALIDATION],
        emits: &[SizingCode::OverclaimedValidation],
        check: check_overclaimed_validation,
    },
    Rule {
        id: "deck_claim_mismatch",
        reads: &[SIZING, INPUTS],
        requires: &[SIZING, INPUTS],
        emits: &[SizingCode::DeckClaimMismatch],
        check: check_deck_claims,
    },
    Rule {
        id: "provenance_unresolved",
        reads: &[SIZING, VALIDATION, INPUTS],
        requires: &[SIZING, VALIDATION],
        emits: &[SizingCode::ProvenanceUnresolved],
        check: check_provenance_unresolved,
    },
];

/// How a figure validation names its figure: label, then figure id.
pub fn figure_name(figure: &Map<String, Value>) -> String {
    text(figure, "label", &text(figure, "figure", "unknown"))
}

fn figures_with_status<'a>(
    ctx: &RuleContext<'a>,
    status: &'a str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    objects(ctx.dict(VALIDATION).get("figure_validations"))
        .filter(move |figure| as_str(figure.get("status")) == Some(status))
}

fn check_missing_optional(ctx: &RuleContext<'_>, out: &mut Out) {
    for spec in ARTIFACTS.iter().filter(|spec| !spec.required) {
        if matches!(ctx.artifacts.state(spec.name), None | Some(ArtifactState::Missing)) {
            out.push(Finding::new(
                SizingCode::MissingOptionalArtifact,
                format!("Optional artifact missing: {}", spec.file_name()),
            ));
        }
    }
}

fn check_unsourced_assumptions(ctx: &RuleContext<'_>, out: &mut Out) {
    let estimated: BTreeSet<&str> = objects(ctx.dict(VALIDATION).get("assumptions"))
        .filter(|assumption| as_str(assumption.get("category")) == Some(AGENT_ESTIMATE))
        .filter_map(|assumption| as_str(assumption.get("name")))
        .filter(|name| is_quantitative(name))
        .collect();

    let stress_tested: BTreeSet<&str> = ctx
        .usable(SENSITIVITY)
        .map(|sensitivity| {
            objects(sensitivity.get("scenarios"))
                .filter(|scenario| as_str(scenario.get("confidence")) == Some(AGENT_ESTIMATE))
                .filter_map(|scenario| as_str(scenario.get("parameter")))
                .collect()
        })
        .unwrap_or_default();

    let unsourced: Vec<String> = estimated
        .difference(&stress_tested)
        .map(|param| param_label(param))
        .collect();
    if !unsourced.is_empty() {
        out.push(Finding::new(
            SizingCode::UnsourcedAssumptions,
            format!(
                "Agent-estimate assumptions not stress-tested in sensitivity: {}",
                bracket_list(&unsourced)
            ),
        ));
    }
}

fn check_unvalidated_claims(ctx: &RuleContext<'_>, out: &mut Out) {
    for figure in figures_with_status(ctx, "unsupported") {
        out.push(Finding::new(
            SizingCode::UnvalidatedClaims,
            format!("Unsupported figure: {}", figure_name(figure)),
        ));
    }
}

fn check_refuted_claims(ctx: &RuleContext<'_>, out: &mut Out) {
    for figure in figures_with_status(ctx, "refuted") {
        let name = figure_name(figure);
        let refutation = figure
            .get("refutation")
            .filter(|r| truthy(Some(r)))
            .map(display);
        if refutation.is_none() {
            out.push(Finding::new(
                SizingCode::RefutedMissingReason,
                format!("Refuted figure '{name}' has no refutation explanation"),
            ));
        }
        out.push(Finding::new(
            SizingCode::RefutedClaims,
            format!(
                "Refuted figure: {name} — {}",
                refutation.as_deref().unwrap_or("no explanation provided")
            ),
        ));
    }
}

fn check_approach_mismatch(ctx: &RuleContext<'_>, out: &mut Out) {
    let sizing = ctx.dict(SIZING);
    let approach = as_str(ctx.dict(METHODOLOGY).get("approach_chosen")).unwrap_or_default();
    match approach {
        "both" => {
            if !sizing.contains_key("top_down") || !sizing.contains_key("bottom_up") {
                out.push(Finding::new(
                    SizingCode::ApproachMismatch,
                    "Methodology says 'both' but sizing.json missing top_down or bottom_up",
                ));
            }
        }
        "top_down" | "bottom_up" if !sizing.contains_key(approach) => {
            out.push(Finding::new(
                SizingCode::ApproachMismatch,
                format!("Methodology says '{approach}' but sizing.json missing {approach} key"),
            ));
        }
        _ => {}
    }
}

fn check_tam_discrepancy(ctx: &RuleContext<'_>, out: &mut Out) {
    let comparison = as_dict(ctx.dict(SIZING).get("comparison"));
    if number_or(comparison.get("tam_delta_pct"), 0.0) > TAM_DISCREPANCY_PCT {
        out.push(Finding::new(
            SizingCode::TamDiscrepancy,
            format!(
                "Top-down and bottom-up TAM differ by {}% (>30%)",
                text(comparison, "tam_delta_pct", "0")
            ),
        ));
    }
}

fn check_checklist_failures(ctx: &RuleContext<'_>, out: &mut Out) {
    let summary = as_dict(ctx.dict(CHECKLIST).get("summary"));
    if as_str(summary.get("overall_status")) != Some("fail") {
        return;
    }
    let failed: Vec<String> = objects(summary.get("failed_items"))
        .map(|item| text(item, "id", "?"))
        .collect();
    out.push(Finding::new(
        SizingCode::ChecklistFailures,
        format!("Checklist has {} failures: {}", failed.len(), bracket_list(&failed)),
    ));
}

fn check_checklist_incomplete(ctx: &RuleContext<'_>, out: &mut Out) {
    let count = as_list(ctx.dict(CHECKLIST).get("items")).len();
    if count != EXPECTED_CHECKLIST_ITEMS {
        out.push(Finding::new(
            SizingCode::ChecklistIncomplete,
            format!("Checklist has {count} items (expected 22)"),
        ));
    }
}

fn check_checklist_coverage(ctx: &RuleContext<'_>, out: &mut Out) {
    let summary = as_dict(ctx.dict(CHECKLIST).get("summary"));
    if number_or(summary.get("not_applicable"), 0.0) > MAX_NOT_APPLICABLE {
        out.push(Finding::new(
            SizingCode::LowChecklistCoverage,
            format!(
                "Checklist has {} not_applicable items (>7 of 22)",
                text(summary, "not_applicable", "0")
            ),
        ));
    }
}

fn check_few_sensitivity_params(ctx: &RuleContext<'_>, out: &mut Out) {
    let count = as_list(ctx.dict(SENSITIVITY).get("scenarios")).len();
    if count < MIN_SCENARIOS {
        out.push(Finding::new(
            SizingCode::FewSensitivityParams,
            format!("Sensitivity analysis has {count} parameters (recommend 3+)"),
        ));
    }
}

fn check_narrow_ranges(ctx: &RuleContext<'_>, out: &mut Out) {
    let estimates = objects(ctx.dict(SENSITIVITY).get("scenarios"))
        .filter(|scenario| as_str(scenario.get("confidence")) == Some(AGENT_ESTIMATE));
    for scenario in estimates {
        let range = as_dict(scenario.get("effective_range"));
        let low = number_or(range.get("low_pct"), 0.0).abs();
        let high = number_or(range.get("high_pct"), 0.0).abs();
        if low < MIN_ESTIMATE_RANGE_PCT || high < MIN_ESTIMATE_RANGE_PCT {
            out.push(Finding::new(
                SizingCode::NarrowAgentEstimateRange,
                format!(
                    "Agent-estimate parameter '{}' has effective range [{}%, +{}%] \
                     — should be at least +/-50%",
                    text(scenario, "parameter", "?"),
                    text(range, "low_pct", "0"),
                    text(range, "high_pct", "0"),
                ),
            ));
        }
    }
}

fn check_overclaimed_validation(ctx: &RuleContext<'_>, out: &mut Out) {
    for figure in figures_with_status(ctx, "validated") {
        if number_or(figure.get("source_count"), 0.0) < MIN_VALIDATING_SOURCES {
            out.push(Finding::new(
                SizingCode::OverclaimedValidation,
                format!(
                    "Figure '{}' marked validated but source_count={}",
                    figure_name(figure),
                    text(figure, "source_count", "0")
                ),
            ));
        }
    }
}

fn check_deck_claims(ctx: &RuleContext<'_>, out: &mut Out) {
    let provenance = Provenance::compute(
        ctx.dict(SIZING),
        ctx.usable(VALIDATION),
        ctx.usable(INPUTS),
    );
    for (_, approach) in provenance.approaches() {
        for (figure, data) in approach.figures() {
            let Some((claim, delta)) = data.deck_mismatch() else {
                continue;
            };
            out.push(Finding::new(
                SizingCode::DeckClaimMismatch,
                format!(
                    "{} differs from deck claim by {delta:+.1}% (deck: {}, calculated: {})",
                    figure.to_uppercase(),
                    fmt_usd(claim),
                    fmt_usd(data.calculated),
                ),
            ));
        }
    }
}

fn check_provenance_unresolved(ctx: &RuleContext<'_>, out: &mut Out) {
    let provenance = Provenance::compute(
        ctx.dict(SIZING),
        ctx.usable(VALIDATION),
        ctx.usable(INPUTS),
    );
    let grouped = provenance.unresolved_by_param();
    if grouped.is_empty() {
        return;
    }
    let parts: Vec<String> = grouped
        .iter()
        .map(|(param, figures)| format!("{param} (used in {})", figures.join(", ")))
        .collect();
    out.push(Finding::new(
        SizingCode::ProvenanceUnresolved,
        format!(
            "Quantitative inputs without matching assumptions in {}: {}",
            file_name(VALIDATION),
            parts.join(", ")
        ),
    ));
}
