//! Market sizing: inputs, methodology, figure validation, TAM/SAM/SOM
//! sizing, sensitivity analysis and the self-check checklist.
//!
//! Besides the report, this pipeline attaches a `provenance` block that
//! classifies every sizing figure by the confidence of its inputs.

mod provenance;
mod rules;
mod sections;

pub use provenance::{
    ApproachProvenance, Classification, ConfidenceBreakdown, FigureProvenance, Provenance,
    Unresolved,
};

use dossier_kernel::markdown::humanize;
use dossier_kernel::{ArtifactSpec, Pipeline, PipelineDescriptor, RuleRegistry, rule_codes};

pub const INPUTS: &str = "inputs";
pub const METHODOLOGY: &str = "methodology";
pub const VALIDATION: &str = "validation";
pub const SIZING: &str = "sizing";
pub const CHECKLIST: &str = "checklist";
pub const SENSITIVITY: &str = "sensitivity";

pub const ARTIFACTS: &[ArtifactSpec] = &[
    ArtifactSpec::required(INPUTS),
    ArtifactSpec::required(METHODOLOGY),
    ArtifactSpec::required(VALIDATION),
    ArtifactSpec::required(SIZING),
    ArtifactSpec::required(CHECKLIST),
    ArtifactSpec::optional(SENSITIVITY),
];

/// Sizing approaches in report order.
pub const APPROACHES: [&str; 2] = ["top_down", "bottom_up"];
/// Figures within each approach, in report order.
pub const FIGURES: [&str; 3] = ["tam", "sam", "som"];

/// Input parameters that carry a market assumption. Intermediates such as
/// `tam` feeding `sam` are not listed.
pub const QUANTITATIVE_PARAMS: [&str; 7] = [
    "customer_count",
    "arpu",
    "serviceable_pct",
    "target_pct",
    "industry_total",
    "segment_pct",
    "share_pct",
];

const PARAM_LABELS: [(&str, &str); 9] = [
    ("customer_count", "Customer Count"),
    ("arpu", "ARPU"),
    ("serviceable_pct", "Serviceable %"),
    ("target_pct", "Target Capture %"),
    ("industry_total", "Industry Total"),
    ("segment_pct", "Segment %"),
    ("share_pct", "Market Share %"),
    ("tam", "TAM"),
    ("sam", "SAM"),
];

pub fn is_quantitative(param: &str) -> bool {
    QUANTITATIVE_PARAMS.contains(&param)
}

/// Display label for a sizing parameter.
pub fn param_label(param: &str) -> String {
    PARAM_LABELS
        .iter()
        .find(|(name, _)| *name == param)
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| humanize(param))
}

/// `Top-down` / `Bottom-up`.
pub fn approach_label(approach: &str) -> &'static str {
    if approach == "top_down" {
        "Top-down"
    } else {
        "Bottom-up"
    }
}

rule_codes! {
    /// Finding codes for market sizing.
    pub enum SizingCode {
        CorruptArtifact => ("CORRUPT_ARTIFACT", High, "Corrupt Artifact"),
        MissingArtifact => ("MISSING_ARTIFACT", High, "Missing Artifact"),
        ChecklistFailures => ("CHECKLIST_FAILURES", High, "Checklist Failures"),
        OverclaimedValidation => ("OVERCLAIMED_VALIDATION", High, "Overclaimed Validation"),
        UnvalidatedClaims => ("UNVALIDATED_CLAIMS", High, "Unvalidated Claims"),
        MissingOptionalArtifact => ("MISSING_OPTIONAL_ARTIFACT", Low, "Missing Optional Artifact"),
        UnsourcedAssumptions => ("UNSOURCED_ASSUMPTIONS", Medium, "Unsourced Assumptions"),
        ApproachMismatch => ("APPROACH_MISMATCH", Medium, "Approach Mismatch"),
        TamDiscrepancy => ("TAM_DISCREPANCY", Medium, "TAM Discrepancy"),
        ChecklistIncomplete => ("CHECKLIST_INCOMPLETE", Medium, "Checklist Incomplete"),
        FewSensitivityParams => ("FEW_SENSITIVITY_PARAMS", Medium, "Few Sensitivity Parameters"),
        NarrowAgentEstimateRange => ("NARROW_AGENT_ESTIMATE_RANGE", Medium, "Narrow Agent-Estimate Range"),
        LowChecklistCoverage => ("LOW_CHECKLIST_COVERAGE", Medium, "Low Checklist Coverage"),
        RefutedClaims => ("REFUTED_CLAIMS", Medium, "Refuted Claims"),
        RefutedMissingReason => ("REFUTED_MISSING_REASON", Medium, "Refuted Claim Missing Reason"),
        DeckClaimMismatch => ("DECK_CLAIM_MISMATCH", Low, "Deck Claim Mismatch"),
        ProvenanceUnresolved => ("PROVENANCE_UNRESOLVED", Low, "Provenance Unresolved"),
    }
}

pub static PIPELINE: Pipeline<SizingCode> = Pipeline {
    descriptor: PipelineDescriptor {
        name: "market-sizing",
        agent: "Market Sizing Agent",
        artifacts: ARTIFACTS,
        acceptance_owner: METHODOLOGY,
    },
    registry: RuleRegistry::new(rules::RULES),
    sections: sections::SECTIONS,
    supplement: Some(provenance::supplement),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_labels_fall_back_to_title_case() {
        assert_eq!(param_label("arpu"), "ARPU");
        assert_eq!(param_label("share_pct"), "Market Share %");
        assert_eq!(param_label("churn_rate"), "Churn Rate");
    }
}
