//! Investment-committee simulation: startup and fund profiles, conflict
//! check, partner discussion and dimension scoring.

mod rules;
mod schema;
mod sections;

use dossier_kernel::{ArtifactSpec, Pipeline, PipelineDescriptor, RuleRegistry, rule_codes};

pub const STARTUP_PROFILE: &str = "startup_profile";
pub const FUND_PROFILE: &str = "fund_profile";
pub const CONFLICT_CHECK: &str = "conflict_check";
pub const DISCUSSION: &str = "discussion";
pub const SCORE_DIMENSIONS: &str = "score_dimensions";
pub const PRIOR_ARTIFACTS: &str = "prior_artifacts";
pub const PARTNER_ASSESSMENTS: [&str; 3] = [
    "partner_assessment_visionary",
    "partner_assessment_operator",
    "partner_assessment_analyst",
];

pub const ARTIFACTS: &[ArtifactSpec] = &[
    ArtifactSpec::required(STARTUP_PROFILE),
    ArtifactSpec::required(FUND_PROFILE),
    ArtifactSpec::required(CONFLICT_CHECK),
    ArtifactSpec::required(DISCUSSION),
    ArtifactSpec::required(SCORE_DIMENSIONS),
    ArtifactSpec::optional(PRIOR_ARTIFACTS),
    ArtifactSpec::optional(PARTNER_ASSESSMENTS[0]),
    ArtifactSpec::optional(PARTNER_ASSESSMENTS[1]),
    ArtifactSpec::optional(PARTNER_ASSESSMENTS[2]),
];

rule_codes! {
    /// Finding codes for the IC simulation.
    pub enum IcCode {
        CorruptArtifact => ("CORRUPT_ARTIFACT", High, "Corrupt Artifact"),
        MissingArtifact => ("MISSING_ARTIFACT", High, "Missing Artifact"),
        BlockingConflict => ("BLOCKING_CONFLICT", High, "Blocking Conflict"),
        OrphanedConflict => ("ORPHANED_CONFLICT", High, "Orphaned Conflict"),
        VerdictScoreMismatch => ("VERDICT_SCORE_MISMATCH", High, "Verdict/Score Mismatch"),
        PartnerUnanimity => ("PARTNER_UNANIMITY", Medium, "Partner Unanimity"),
        ZeroApplicable => ("ZERO_APPLICABLE", Medium, "Zero Applicable Dimensions"),
        StaleImport => ("STALE_IMPORT", Medium, "Stale Import"),
        LowEvidence => ("LOW_EVIDENCE", Medium, "Low Evidence"),
        FundValidationError => ("FUND_VALIDATION_ERROR", Medium, "Fund Validation Error"),
        DegradedAssessment => ("DEGRADED_ASSESSMENT", Medium, "Degraded Assessment"),
        ConsensusScoreMismatch => ("CONSENSUS_SCORE_MISMATCH", Medium, "Consensus/Score Verdict Mismatch"),
        UnanimousVerdictMismatch => ("UNANIMOUS_VERDICT_MISMATCH", Medium, "Unanimous Verdict Mismatch"),
        ShallowAssessment => ("SHALLOW_ASSESSMENT", Medium, "Shallow Assessment"),
        HighNaCount => ("HIGH_NA_COUNT", Medium, "High N/A Count"),
        SchemaDrift => ("SCHEMA_DRIFT", Low, "Schema Drift"),
        StageOutOfScope => ("STAGE_OUT_OF_SCOPE", Low, "Stage Out of Scope"),
        PartnerConvergence => ("PARTNER_CONVERGENCE", Info, "Partner Convergence"),
        SequentialFallback => ("SEQUENTIAL_FALLBACK", Info, "Sequential Fallback"),
    }
}

pub static PIPELINE: Pipeline<IcCode> = Pipeline {
    descriptor: PipelineDescriptor {
        name: "ic-sim",
        agent: "IC Simulation Agent",
        artifacts: ARTIFACTS,
        acceptance_owner: FUND_PROFILE,
    },
    registry: RuleRegistry::new(rules::RULES),
    sections: sections::SECTIONS,
    supplement: None,
};
