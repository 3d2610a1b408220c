use super::{CHECKLIST, DECK_INVENTORY, DeckCode, SLIDE_REVIEWS, STAGE_PROFILE};
use crate::is_calibrated_stage;
use dossier_kernel::coerce::{as_dict, as_list, category, number_or, objects, truthy};
use dossier_kernel::markdown::display;
use dossier_kernel::{Finding, Rule, RuleContext, check_integrity};

pub const CRITICAL_FAILURE_THRESHOLD: f64 = 10.0;
pub const MIN_SLIDES: f64 = 5.0;
pub const MAX_SLIDES: f64 = 20.0;

pub const AI_CRITERIA: [&str; 4] = [
    "ai_retention_rebased",
    "ai_cost_to_serve_shown",
    "ai_defensibility_beyond_model",
    "ai_responsible_controls",
];

type Out = Vec<Finding<DeckCode>>;

pub static RULES: &[Rule<DeckCode>] = &[
    Rule {
        id: "artifact_integrity",
        reads: &[DECK_INVENTORY, STAGE_PROFILE, SLIDE_REVIEWS, CHECKLIST],
        requires: &[],
        emits: &[DeckCode::CorruptArtifact, DeckCode::MissingArtifact],
        check: check_integrity::<DeckCode>,
    },
    Rule {
        id: "checklist_failures_critical",
        reads: &[CHECKLIST],
        requires: &[CHECKLIST],
        emits: &[DeckCode::ChecklistFailuresCritical],
        check: check_checklist_failures,
    },
    Rule {
        id: "stage_mismatch",
        reads: &[DECK_INVENTORY, STAGE_PROFILE],
        requires: &[DECK_INVENTORY, STAGE_PROFILE],
        emits: &[DeckCode::StageMismatch],
        check: check_stage_mismatch,
    },
    Rule {
        id: "stage_out_of_scope",
        reads: &[STAGE_PROFILE, DECK_INVENTORY],
        requires: &[],
        emits: &[DeckCode::StageOutOfScope],
        check: check_stage_out_of_scope,
    },
    Rule {
        id: "slide_count_extreme",
        reads: &[DECK_INVENTORY],
        requires: &[DECK_INVENTORY],
        emits: &[DeckCode::SlideCountExtreme],
        check: check_slide_count,
    },
    Rule {
        id: "uncited_critique",
        reads: &[SLIDE_REVIEWS],
        requires: &[SLIDE_REVIEWS],
        emits: &[DeckCode::UncitedCritique],
        check: check_uncited_critique,
    },
    Rule {
        id: "ai_criteria_skipped",
        reads: &[STAGE_PROFILE, CHECKLIST],
        requires: &[STAGE_PROFILE, CHECKLIST],
        emits: &[DeckCode::AiCriteriaSkipped],
        check: check_ai_criteria,
    },
];

fn check_checklist_failures(ctx: &RuleContext<'_>, out: &mut Out) {
    let summary = as_dict(ctx.dict(CHECKLIST).get("summary"));
    let fail = number_or(summary.get("fail"), 0.0);
    if fail > CRITICAL_FAILURE_THRESHOLD {
        out.push(Finding::new(
            DeckCode::ChecklistFailuresCritical,
            format!("Checklist has {fail} failures (>10 — critical threshold)"),
        ));
    }
}

fn check_stage_mismatch(ctx: &RuleContext<'_>, out: &mut Out) {
    let claimed = category(ctx.dict(DECK_INVENTORY).get("claimed_stage"));
    let detected = category(ctx.dict(STAGE_PROFILE).get("detected_stage"));
    if !claimed.is_empty() && !detected.is_empty() && claimed != detected {
        out.push(Finding::new(
            DeckCode::StageMismatch,
            format!("Deck claims '{claimed}' but analysis detected '{detected}'"),
        ));
    }
}

fn check_stage_out_of_scope(ctx: &RuleContext<'_>, out: &mut Out) {
    let mut stages: Vec<String> = Vec::new();
    let candidates = [
        ctx.usable(STAGE_PROFILE).map(|p| category(p.get("detected_stage"))),
        ctx.usable(DECK_INVENTORY).map(|i| category(i.get("claimed_stage"))),
    ];
    for stage in candidates.into_iter().flatten() {
        if !stage.is_empty() && !is_calibrated_stage(&stage) && !stages.contains(&stage) {
            stages.push(stage);
        }
    }
    if !stages.is_empty() {
        out.push(Finding::new(
            DeckCode::StageOutOfScope,
            format!(
                "Stage '{}' is outside calibrated range (pre_seed, seed, series_a). \
                 Results may be less precise.",
                stages.join(", ")
            ),
        ));
    }
}

fn check_slide_count(ctx: &RuleContext<'_>, out: &mut Out) {
    let total = number_or(ctx.dict(DECK_INVENTORY).get("total_slides"), 0.0);
    if total < MIN_SLIDES {
        out.push(Finding::new(
            DeckCode::SlideCountExtreme,
            format!("Deck has only {total} slides (<5 — too few for a complete pitch)"),
        ));
    } else if total > MAX_SLIDES {
        out.push(Finding::new(
            DeckCode::SlideCountExtreme,
            format!("Deck has {total} slides (>20 — sharp engagement drop-off after ~18)"),
        ));
    }
}

fn check_uncited_critique(ctx: &RuleContext<'_>, out: &mut Out) {
    for review in objects(ctx.dict(SLIDE_REVIEWS).get("reviews")) {
        let has_weaknesses = !as_list(review.get("weaknesses")).is_empty();
        let has_refs = !as_list(review.get("best_practice_refs")).is_empty();
        if has_weaknesses && !has_refs {
            let slide = review
                .get("slide_number")
                .map(display)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "?".to_string());
            out.push(Finding::new(
                DeckCode::UncitedCritique,
                format!("Slide {slide} has critiques without best-practice citations"),
            ));
        }
    }
}

fn check_ai_criteria(ctx: &RuleContext<'_>, out: &mut Out) {
    if !truthy(ctx.dict(STAGE_PROFILE).get("is_ai_company")) {
        return;
    }
    let ai_items: Vec<_> = objects(ctx.dict(CHECKLIST).get("items"))
        .filter(|item| {
            item.get("id")
                .and_then(|id| id.as_str())
                .is_some_and(|id| AI_CRITERIA.contains(&id))
        })
        .collect();
    let all_skipped = ai_items
        .iter()
        .all(|item| item.get("status").and_then(|s| s.as_str()) == Some("not_applicable"));
    if !ai_items.is_empty() && all_skipped {
        out.push(Finding::new(
            DeckCode::AiCriteriaSkipped,
            "Company detected as AI-first but all AI criteria marked not_applicable",
        ));
    }
}
