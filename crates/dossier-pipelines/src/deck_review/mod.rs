//! Pitch-deck review: slide inventory, stage profile, per-slide critique and
//! the best-practice checklist.

mod rules;
mod sections;

use dossier_kernel::{ArtifactSpec, Pipeline, PipelineDescriptor, RuleRegistry, rule_codes};

pub const DECK_INVENTORY: &str = "deck_inventory";
pub const STAGE_PROFILE: &str = "stage_profile";
pub const SLIDE_REVIEWS: &str = "slide_reviews";
pub const CHECKLIST: &str = "checklist";

pub const ARTIFACTS: &[ArtifactSpec] = &[
    ArtifactSpec::required(DECK_INVENTORY),
    ArtifactSpec::required(STAGE_PROFILE),
    ArtifactSpec::required(SLIDE_REVIEWS),
    ArtifactSpec::required(CHECKLIST),
];

rule_codes! {
    /// Finding codes for deck review.
    pub enum DeckCode {
        CorruptArtifact => ("CORRUPT_ARTIFACT", High, "Corrupt Artifact"),
        MissingArtifact => ("MISSING_ARTIFACT", High, "Missing Artifact"),
        ChecklistFailuresCritical => ("CHECKLIST_FAILURES_CRITICAL", High, "Checklist Failures (Critical)"),
        StageMismatch => ("STAGE_MISMATCH", Medium, "Stage Mismatch"),
        SlideCountExtreme => ("SLIDE_COUNT_EXTREME", Medium, "Slide Count"),
        UncitedCritique => ("UNCITED_CRITIQUE", Medium, "Uncited Critique"),
        AiCriteriaSkipped => ("AI_CRITERIA_SKIPPED", Medium, "AI Criteria Skipped"),
        StageOutOfScope => ("STAGE_OUT_OF_SCOPE", Low, "Stage Out of Scope"),
    }
}

pub static PIPELINE: Pipeline<DeckCode> = Pipeline {
    descriptor: PipelineDescriptor {
        name: "deck-review",
        agent: "Deck Review Agent",
        artifacts: ARTIFACTS,
        acceptance_owner: STAGE_PROFILE,
    },
    registry: RuleRegistry::new(rules::RULES),
    sections: sections::SECTIONS,
    supplement: None,
};
