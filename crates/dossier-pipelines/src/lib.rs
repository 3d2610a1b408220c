//! The three composition pipelines: pitch-deck review, investment-committee
//! simulation and market sizing.
//!
//! Each pipeline module declares its artifacts, a closed code enum, an
//! ordered rule table and an ordered section table, and exposes them as one
//! `static PIPELINE` value for the kernel to drive.

pub mod deck_review;
pub mod ic_sim;
pub mod market_sizing;

/// Stages the scoring rubrics are calibrated for.
pub const CALIBRATED_STAGES: [&str; 3] = ["pre_seed", "seed", "series_a"];

pub(crate) fn is_calibrated_stage(stage: &str) -> bool {
    CALIBRATED_STAGES.contains(&stage)
}
