//! End-to-end compositions over artifact directories on disk.

use chrono::NaiveDate;
use dossier_kernel::{
    ComposeOptions, Composition, DirectiveRejection, RuleCode, Severity, ValidationStatus,
};
use dossier_pipelines::{deck_review, ic_sim, market_sizing};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn options() -> ComposeOptions {
    ComposeOptions {
        as_of: NaiveDate::from_ymd_opt(2025, 3, 20).expect("valid date"),
    }
}

fn write_artifact(dir: &Path, name: &str, value: &Value) {
    let path = dir.join(format!("{name}.json"));
    let body = serde_json::to_string_pretty(value).expect("fixture should serialize");
    fs::write(&path, body).unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}

fn write_raw(dir: &Path, name: &str, body: &str) {
    let path = dir.join(format!("{name}.json"));
    fs::write(&path, body).unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}

fn codes<C: RuleCode>(composition: &Composition<C>) -> Vec<&'static str> {
    composition
        .validation
        .warnings
        .iter()
        .map(|finding| finding.code.as_str())
        .collect()
}

fn clean_deck() -> TempDir {
    let dir = TempDir::new().expect("temp dir should be created");
    write_artifact(
        dir.path(),
        deck_review::DECK_INVENTORY,
        &json!({
            "company_name": "Acme Robotics",
            "review_date": "2025-03-18",
            "input_format": "pdf",
            "total_slides": 12,
            "claimed_stage": "seed"
        }),
    );
    write_artifact(
        dir.path(),
        deck_review::STAGE_PROFILE,
        &json!({
            "detected_stage": "seed",
            "confidence": "high",
            "is_ai_company": false,
            "evidence": ["$40K MRR", "Raising $3M"],
            "stage_benchmarks": {
                "round_size_range": "$2M-$4M",
                "expected_traction": "$20K-$100K MRR",
                "runway_expectation": "18-24 months"
            },
            "accepted_warnings": []
        }),
    );
    write_artifact(
        dir.path(),
        deck_review::SLIDE_REVIEWS,
        &json!({
            "reviews": [{
                "slide_number": 1,
                "maps_to": "problem",
                "strengths": ["Concrete pain point"],
                "weaknesses": ["No market quantification"],
                "recommendations": ["Add the cost of the problem"],
                "best_practice_refs": ["sequoia_problem"]
            }],
            "missing_slides": [],
            "overall_narrative_assessment": "Clear arc from problem to ask."
        }),
    );
    write_artifact(
        dir.path(),
        deck_review::CHECKLIST,
        &json!({
            "items": [
                {"id": "problem_clear", "category": "Narrative", "label": "Problem is clear", "status": "pass"},
                {"id": "ask_specific", "category": "Ask", "label": "Ask is specific", "status": "fail"}
            ],
            "summary": {
                "overall_status": "solid",
                "score_pct": 85,
                "pass": 1,
                "fail": 1,
                "warn": 0,
                "not_applicable": 0,
                "by_category": {
                    "Narrative": {"pass": 1, "fail": 0, "warn": 0, "not_applicable": 0},
                    "Ask": {"pass": 0, "fail": 1, "warn": 0, "not_applicable": 0}
                },
                "failed_items": [
                    {"id": "ask_specific", "label": "Ask is specific", "category": "Ask", "notes": "State the amount"}
                ],
                "warned_items": []
            }
        }),
    );
    dir
}

fn compose_deck(dir: &Path) -> Composition<deck_review::DeckCode> {
    let pipeline = &deck_review::PIPELINE;
    pipeline.compose(&pipeline.load(dir), &options())
}

#[test]
fn clean_deck_has_no_warnings_section() {
    let dir = clean_deck();
    let composition = compose_deck(dir.path());

    assert_eq!(composition.validation.status, ValidationStatus::Clean);
    assert!(composition.validation.warnings.is_empty());
    assert_eq!(composition.validation.artifacts_found.len(), 4);
    assert!(composition.validation.artifacts_missing.is_empty());

    let report = &composition.report_markdown;
    assert!(report.starts_with("# Pitch Deck Review: Acme Robotics\n"));
    assert!(report.contains("**Overall Score:** 85% — Solid"));
    assert!(report.contains("1. Ask is specific: State the amount"));
    assert!(!report.contains("## Warnings"));
    assert!(report.ends_with("— Deck Review Agent*\n"));
    assert!(!composition.blocks_strict());

    insta::assert_json_snapshot!(composition.validation, @r#"
    {
      "status": "clean",
      "warnings": [],
      "artifacts_found": [
        "deck_inventory.json",
        "stage_profile.json",
        "slide_reviews.json",
        "checklist.json"
      ],
      "artifacts_missing": []
    }
    "#);
}

#[test]
fn corrupt_checklist_is_reported_once_as_corrupt() {
    let dir = clean_deck();
    write_raw(dir.path(), deck_review::CHECKLIST, "{not json");
    let composition = compose_deck(dir.path());

    assert_eq!(codes(&composition), vec!["CORRUPT_ARTIFACT"]);
    assert_eq!(
        composition.validation.warnings[0].message,
        "Artifact has invalid JSON: checklist.json"
    );
    assert!(!composition
        .validation
        .artifacts_found
        .contains(&"checklist.json".to_string()));
    assert!(composition.validation.artifacts_missing.is_empty());
    assert!(composition
        .report_markdown
        .contains("*Checklist data could not be read: invalid JSON.*"));
    assert!(composition.blocks_strict());
}

#[test]
fn accepted_stage_mismatch_no_longer_blocks() {
    let dir = clean_deck();
    write_artifact(
        dir.path(),
        deck_review::DECK_INVENTORY,
        &json!({"company_name": "Acme Robotics", "total_slides": 12, "claimed_stage": "series_a"}),
    );
    write_artifact(
        dir.path(),
        deck_review::STAGE_PROFILE,
        &json!({
            "detected_stage": "seed",
            "accepted_warnings": [
                {"code": "STAGE_MISMATCH", "match": "DECK CLAIMS", "reason": "intentional"},
                {"code": "CHECKLIST_FAILURES_CRITICAL", "match": "failures", "reason": "known"}
            ]
        }),
    );
    let composition = compose_deck(dir.path());

    let finding = &composition.validation.warnings[0];
    assert_eq!(finding.severity, Severity::Acknowledged);
    assert_eq!(
        finding.message,
        "Deck claims 'series_a' but analysis detected 'seed' [Accepted: intentional]"
    );
    assert_eq!(composition.validation.status, ValidationStatus::Warnings);
    assert!(!composition.blocks_strict());
    assert!(matches!(
        composition.rejected_directives.as_slice(),
        [DirectiveRejection::NotAcceptable { index: 1, .. }]
    ));

    insta::assert_snapshot!(composition.summary_lines().join("\n"), @r"
    Artifacts found: 4/4
    Warnings: 0 high, 0 medium, 0 low, 0 info, 1 acknowledged
      [ACKNOWLEDGED] STAGE_MISMATCH: Deck claims 'series_a' but analysis detected 'seed' [Accepted: intentional]
    ");
}

#[test]
fn composition_is_deterministic() {
    let dir = clean_deck();
    let first = compose_deck(dir.path()).to_json(true).expect("serialize");
    let second = compose_deck(dir.path()).to_json(true).expect("serialize");
    assert_eq!(first, second);
    assert!(first.ends_with("}\n"));
}

#[test]
fn garbage_fields_degrade_without_panicking() {
    let dir = TempDir::new().expect("temp dir should be created");
    write_artifact(
        dir.path(),
        deck_review::DECK_INVENTORY,
        &json!({"total_slides": "twelve", "claimed_stage": 7, "company_name": ["x"]}),
    );
    write_artifact(
        dir.path(),
        deck_review::STAGE_PROFILE,
        &json!({"evidence": 5, "stage_benchmarks": "x", "accepted_warnings": "nope", "is_ai_company": "yes"}),
    );
    write_artifact(
        dir.path(),
        deck_review::SLIDE_REVIEWS,
        &json!({"reviews": "nope", "missing_slides": [1, "two", null]}),
    );
    write_artifact(
        dir.path(),
        deck_review::CHECKLIST,
        &json!({"summary": [], "items": {"a": 1}}),
    );
    let composition = compose_deck(dir.path());
    assert!(composition.report_markdown.starts_with("# Pitch Deck Review: "));
    assert!(codes(&composition).contains(&"SLIDE_COUNT_EXTREME"));
}

#[test]
fn non_object_documents_count_as_corrupt() {
    let dir = clean_deck();
    write_raw(dir.path(), deck_review::SLIDE_REVIEWS, "[1, 2, 3]");
    let composition = compose_deck(dir.path());
    assert_eq!(codes(&composition), vec!["CORRUPT_ARTIFACT"]);
}

#[test]
fn empty_directory_reports_every_required_artifact() {
    let dir = TempDir::new().expect("temp dir should be created");

    let ic = ic_sim::PIPELINE.compose(&ic_sim::PIPELINE.load(dir.path()), &options());
    assert_eq!(codes(&ic), vec!["MISSING_ARTIFACT"; 5]);
    assert_eq!(ic.summary_lines()[0], "Artifacts found: 0/9");
    assert!(ic.report_markdown.starts_with("# IC Simulation Report\n"));

    let sizing =
        market_sizing::PIPELINE.compose(&market_sizing::PIPELINE.load(dir.path()), &options());
    let mut expected = vec!["MISSING_ARTIFACT"; 5];
    expected.push("MISSING_OPTIONAL_ARTIFACT");
    assert_eq!(codes(&sizing), expected);
    assert!(sizing.provenance.is_none());
    assert_eq!(sizing.validation.artifacts_missing.len(), 6);
}

#[test]
fn ic_stub_prior_artifacts_is_found_but_silent() {
    let dir = TempDir::new().expect("temp dir should be created");
    write_artifact(
        dir.path(),
        ic_sim::PRIOR_ARTIFACTS,
        &json!({"skipped": true, "reason": "no prior runs"}),
    );
    let composition = ic_sim::PIPELINE.compose(&ic_sim::PIPELINE.load(dir.path()), &options());
    assert!(composition
        .validation
        .artifacts_found
        .contains(&"prior_artifacts.json".to_string()));
    assert!(!codes(&composition).contains(&"STALE_IMPORT"));
    assert!(!codes(&composition).contains(&"SCHEMA_DRIFT"));
}

#[test]
fn ic_blocking_conflict_is_high_and_unacceptable() {
    let dir = TempDir::new().expect("temp dir should be created");
    write_artifact(
        dir.path(),
        ic_sim::CONFLICT_CHECK,
        &json!({
            "portfolio_size": 1,
            "conflicts": [{"company": "Globex Inc", "type": "direct", "severity": "blocking", "rationale": "same market"}],
            "summary": {"has_blocking_conflict": true, "total_checked": 1, "conflict_count": 1}
        }),
    );
    write_artifact(
        dir.path(),
        ic_sim::FUND_PROFILE,
        &json!({
            "fund_name": "Northwind",
            "mode": "generic",
            "thesis_areas": ["robotics"],
            "check_size_range": {"min": 500000, "max": 2000000},
            "stage_focus": ["seed"],
            "archetypes": [],
            "portfolio": [{"name": "globex"}],
            "validation": {"status": "valid"},
            "accepted_warnings": [
                {"code": "BLOCKING_CONFLICT", "match": "blocking", "reason": "waived"}
            ]
        }),
    );
    let composition = ic_sim::PIPELINE.compose(&ic_sim::PIPELINE.load(dir.path()), &options());
    let blocking = composition
        .validation
        .warnings
        .iter()
        .find(|finding| finding.code.as_str() == "BLOCKING_CONFLICT")
        .expect("blocking conflict should be reported");
    assert_eq!(blocking.severity, Severity::High);
    assert!(!codes(&composition).contains(&"ORPHANED_CONFLICT"));
    assert_eq!(composition.rejected_directives.len(), 1);
    assert!(composition
        .report_markdown
        .contains("- **[BLOCKING]** Globex Inc (direct): same market"));
}

#[test]
fn market_sizing_attaches_provenance() {
    let dir = TempDir::new().expect("temp dir should be created");
    write_artifact(
        dir.path(),
        market_sizing::SIZING,
        &json!({
            "bottom_up": {
                "tam": {"value": 4_800_000_000.0, "inputs": {"customer_count": 120000, "arpu": 40000}},
                "sam": {"value": 960_000_000.0, "inputs": {"tam": 4_800_000_000.0, "serviceable_pct": 20}},
                "som": {"value": 48_000_000.0, "inputs": {"sam": 960_000_000.0, "target_pct": 5}}
            }
        }),
    );
    write_artifact(
        dir.path(),
        market_sizing::VALIDATION,
        &json!({"assumptions": [
            {"name": "customer_count", "category": "sourced"},
            {"name": "arpu", "category": "sourced"},
            {"name": "serviceable_pct", "category": "derived"},
            {"name": "target_pct", "category": "agent_estimate"}
        ]}),
    );
    let composition =
        market_sizing::PIPELINE.compose(&market_sizing::PIPELINE.load(dir.path()), &options());

    let value: Value =
        serde_json::from_str(&composition.to_json(false).expect("serialize")).expect("valid json");
    let bottom_up = &value["provenance"]["bottom_up"];
    assert_eq!(bottom_up["tam"]["classification"], "sourced");
    assert_eq!(bottom_up["sam"]["classification"], "derived");
    assert_eq!(bottom_up["som"]["classification"], "agent_estimate");
    assert_eq!(
        bottom_up["tam"]["confidence_breakdown"],
        json!({"sourced": 2, "derived": 0, "agent_estimate": 0})
    );
    assert!(value["provenance"].get("top_down").is_none());
    assert!(!codes(&composition).contains(&"PROVENANCE_UNRESOLVED"));
    assert!(composition
        .report_markdown
        .contains("| TAM | $4.8B | Bottom-up | sourced | ARPU: $40.0K, Customer Count: 120,000 |"));
}
