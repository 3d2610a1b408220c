//! Every field of a rich fixture replaced by a value of the wrong type.
//!
//! Each case swaps one JSON path (the document root included) for one of
//! the values below and composes the full pipeline. Composition must
//! return and serialize for every case.

use chrono::NaiveDate;
use dossier_kernel::{ArtifactSet, ArtifactState, ComposeOptions, Pipeline, RuleCode};
use dossier_pipelines::{deck_review, ic_sim, market_sizing};
use serde_json::{Value, json};

fn options() -> ComposeOptions {
    ComposeOptions {
        as_of: NaiveDate::from_ymd_opt(2025, 3, 20).expect("valid date"),
    }
}

fn wrong_values() -> Vec<Value> {
    vec![
        Value::Null,
        json!("garbage"),
        json!(""),
        json!(-1),
        json!(-0.5),
        json!(0),
        json!(1e300),
        json!(true),
        json!(false),
        json!([]),
        json!({}),
    ]
}

fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

/// JSON pointers to every node under `value`, the root (`""`) first.
fn pointers(value: &Value) -> Vec<String> {
    fn walk(value: &Value, prefix: String, out: &mut Vec<String>) {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let path = format!("{prefix}/{}", escape(key));
                    out.push(path.clone());
                    walk(child, path, out);
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    let path = format!("{prefix}/{index}");
                    out.push(path.clone());
                    walk(child, path, out);
                }
            }
            _ => {}
        }
    }

    let mut out = vec![String::new()];
    walk(value, String::new(), &mut out);
    out
}

fn artifact_set<C: RuleCode>(pipeline: &Pipeline<C>, fixture: &[(&str, Value)]) -> ArtifactSet {
    ArtifactSet::from_states(pipeline.descriptor.artifacts.iter().map(|spec| {
        let state = fixture
            .iter()
            .find(|(name, _)| *name == spec.name)
            .map_or(ArtifactState::Missing, |(_, value)| {
                ArtifactState::from_value(value.clone())
            });
        (*spec, state)
    }))
}

/// Compose every single-path substitution and return how many ran.
fn exercise<C: RuleCode>(pipeline: &Pipeline<C>, fixture: &[(&str, Value)]) -> usize {
    let options = options();
    let baseline = pipeline.compose(&artifact_set(pipeline, fixture), &options);
    baseline
        .to_json(false)
        .unwrap_or_else(|e| panic!("{} baseline should serialize: {e}", pipeline.descriptor.name));

    let mut runs = 0;
    for (position, (name, document)) in fixture.iter().enumerate() {
        for pointer in pointers(document) {
            for replacement in wrong_values() {
                let mut mutated = fixture.to_vec();
                let target = mutated[position]
                    .1
                    .pointer_mut(&pointer)
                    .unwrap_or_else(|| panic!("pointer {pointer:?} should resolve in {name}"));
                *target = replacement.clone();

                let composition = pipeline.compose(&artifact_set(pipeline, &mutated), &options);
                if let Err(e) = composition.to_json(true) {
                    panic!("{name}{pointer} = {replacement} failed to serialize: {e}");
                }
                assert!(!composition.report_markdown.is_empty());
                runs += 1;
            }
        }
    }
    runs
}

#[test]
fn deck_review_survives_wrong_typed_fields() {
    let fixture = [
        (
            deck_review::DECK_INVENTORY,
            json!({
                "company_name": "Acme Robotics",
                "review_date": "2025-03-18",
                "input_format": "pdf",
                "total_slides": 12,
                "claimed_stage": "seed"
            }),
        ),
        (
            deck_review::STAGE_PROFILE,
            json!({
                "detected_stage": "series_a",
                "confidence": "high",
                "is_ai_company": true,
                "evidence": ["$40K MRR", "Raising $3M"],
                "stage_benchmarks": {
                    "round_size_range": "$2M-$4M",
                    "expected_traction": "$20K-$100K MRR",
                    "runway_expectation": "18-24 months"
                },
                "accepted_warnings": [
                    {"code": "STAGE_MISMATCH", "match": "claims", "reason": "intentional"}
                ]
            }),
        ),
        (
            deck_review::SLIDE_REVIEWS,
            json!({
                "reviews": [
                    {
                        "slide_number": 1,
                        "maps_to": "problem",
                        "strengths": ["Concrete pain point"],
                        "weaknesses": ["No market quantification"],
                        "recommendations": ["Add the cost of the problem"],
                        "best_practice_refs": ["sequoia_problem"]
                    },
                    {
                        "slide_number": 2,
                        "maps_to": "solution",
                        "strengths": [],
                        "weaknesses": ["Vague"],
                        "recommendations": [],
                        "best_practice_refs": []
                    }
                ],
                "missing_slides": [{"expected_type": "team", "importance": "high", "recommendation": "Add one"}],
                "overall_narrative_assessment": "Clear arc from problem to ask."
            }),
        ),
        (
            deck_review::CHECKLIST,
            json!({
                "items": [
                    {"id": "problem_clear", "category": "Narrative", "label": "Problem is clear", "status": "pass"},
                    {"id": "ai_moat", "category": "AI", "label": "AI moat", "status": "not_applicable"},
                    {"id": "ask_specific", "category": "Ask", "label": "Ask is specific", "status": "fail"}
                ],
                "summary": {
                    "overall_status": "needs_work",
                    "score_pct": 61.5,
                    "pass": 1,
                    "fail": 1,
                    "warn": 0,
                    "not_applicable": 1,
                    "by_category": {
                        "Narrative": {"pass": 1, "fail": 0, "warn": 0, "not_applicable": 0},
                        "Ask": {"pass": 0, "fail": 1, "warn": 0, "not_applicable": 0}
                    },
                    "failed_items": [
                        {"id": "ask_specific", "label": "Ask is specific", "category": "Ask", "notes": "State the amount"}
                    ],
                    "warned_items": [{"id": "x", "label": "Y", "category": "Z", "notes": ""}]
                }
            }),
        ),
    ];
    assert!(exercise(&deck_review::PIPELINE, &fixture) > 500);
}

#[test]
fn ic_sim_survives_wrong_typed_fields() {
    let assessment = |partner: &str| {
        json!({
            "partner": partner,
            "verdict": "more_diligence",
            "rationale": "Strong team, unclear wedge into the enterprise buyer.",
            "conviction_points": ["Founder-market fit", "Early revenue"],
            "key_concerns": ["Competitive market"],
            "questions": ["Who signs the contract?"],
            "diligence_items": ["Customer calls"]
        })
    };
    let fixture = [
        (
            ic_sim::STARTUP_PROFILE,
            json!({
                "company_name": "Acme Robotics",
                "simulation_date": "2025-03-18",
                "stage": "seed",
                "one_liner": "Robots for warehouses",
                "sector": "robotics"
            }),
        ),
        (
            ic_sim::FUND_PROFILE,
            json!({
                "fund_name": "Northwind Ventures",
                "mode": "specific",
                "thesis_areas": ["robotics", "logistics"],
                "check_size_range": {"min": 500000, "max": 2000000, "currency": "USD"},
                "stage_focus": ["seed", "series_a"],
                "archetypes": [
                    {"name": "Ana", "role": "visionary", "background": "Operator"},
                    {"name": "Ben", "role": "skeptic", "background": "Banker"},
                    {"name": "Cy", "role": "operator", "background": "Engineer"}
                ],
                "portfolio": [{"name": "Crate Co"}, {"name": "Dock Labs"}],
                "validation": {"status": "valid", "errors": []},
                "accepted_warnings": [
                    {"code": "PARTNER_CONVERGENCE", "match": "partners", "reason": "expected"}
                ]
            }),
        ),
        (
            ic_sim::CONFLICT_CHECK,
            json!({
                "portfolio_size": 2,
                "conflicts": [
                    {"company": "Crate Co", "type": "adjacent", "severity": "manageable", "rationale": "Overlapping buyer"}
                ],
                "summary": {
                    "has_blocking_conflict": false,
                    "total_checked": 2,
                    "conflict_count": 1,
                    "overall_severity": "manageable"
                }
            }),
        ),
        (
            ic_sim::DISCUSSION,
            json!({
                "assessment_mode": "sub-agent",
                "consensus_verdict": "more_diligence",
                "partner_verdicts": [
                    {"partner": "visionary", "verdict": "invest", "rationale": "Big market"},
                    {"partner": "skeptic", "verdict": "pass", "rationale": "Crowded"},
                    {"partner": "operator", "verdict": "more_diligence", "rationale": "Ops unclear"}
                ],
                "debate_sections": [
                    {
                        "topic": "Market size",
                        "exchanges": [
                            {"partner": "visionary", "position": "Huge"},
                            {"partner": "skeptic", "position": "Niche"}
                        ]
                    }
                ],
                "key_concerns": ["Sales cycle length"],
                "diligence_requirements": ["Pipeline review"]
            }),
        ),
        (
            ic_sim::SCORE_DIMENSIONS,
            json!({
                "items": [
                    {"id": "team_fit", "category": "Team", "label": "Team fit", "status": "strong_conviction", "evidence": "Ex-Amazon robotics"},
                    {"id": "market", "category": "Market", "label": "Market", "status": "concern", "evidence": "Crowded"},
                    {"id": "moat", "category": "Product", "label": "Moat", "status": "dealbreaker", "evidence": ""}
                ],
                "summary": {
                    "verdict": "more_diligence",
                    "conviction_score": 58.3,
                    "strong_conviction": 1,
                    "moderate_conviction": 0,
                    "concern": 1,
                    "dealbreaker": 1,
                    "by_category": {"Team": {"strong_conviction": 1}, "Market": {"concern": 1}},
                    "dealbreakers": [
                        {"id": "moat", "label": "Moat", "evidence": "", "category": "Product", "notes": "No defensibility"}
                    ],
                    "top_concerns": [{"id": "market", "label": "Market"}],
                    "warnings": ["Sparse evidence"]
                }
            }),
        ),
        (
            ic_sim::PRIOR_ARTIFACTS,
            json!({
                "imported": [
                    {"source_skill": "deck-review", "import_date": "2025-03-01T10:00:00Z"},
                    {"source_skill": "market-sizing", "import_date": "2025-03-19"}
                ]
            }),
        ),
        (ic_sim::PARTNER_ASSESSMENTS[0], assessment("visionary")),
        (ic_sim::PARTNER_ASSESSMENTS[1], assessment("skeptic")),
        (ic_sim::PARTNER_ASSESSMENTS[2], assessment("operator")),
    ];
    assert!(exercise(&ic_sim::PIPELINE, &fixture) > 1500);
}

#[test]
fn market_sizing_survives_wrong_typed_fields() {
    let figures = |tam: f64| {
        json!({
            "tam": {"value": tam, "inputs": {"customer_count": 120000, "arpu": 5000}},
            "sam": {"value": tam / 4.0, "inputs": {"serviceable_pct": 25}},
            "som": {"value": tam / 40.0, "inputs": {"capture_rate": 10}}
        })
    };
    let fixture = [
        (
            market_sizing::INPUTS,
            json!({
                "company_name": "Acme Robotics",
                "analysis_date": "2025-03-18",
                "materials_provided": ["deck", "financial model"],
                "existing_claims": {"tam": 12e9, "sam": 2e9, "som": 1.5e8}
            }),
        ),
        (
            market_sizing::METHODOLOGY,
            json!({
                "approach_chosen": "both",
                "rationale": "Data available for both",
                "definitions": {"tam": "All warehouses", "sam": "US mid-market", "som": "Five-year reach"},
                "accepted_warnings": [
                    {"code": "TAM_DISCREPANCY", "match": "differ", "reason": "definitions differ"}
                ]
            }),
        ),
        (
            market_sizing::VALIDATION,
            json!({
                "assumptions": [
                    {"name": "customer_count", "category": "quantitative", "value": 120000, "label": "Warehouses"},
                    {"name": "arpu", "category": "quantitative", "value": 5000, "label": "ARPU"},
                    {"name": "buyer", "category": "qualitative", "value": "ops lead", "label": "Buyer"}
                ],
                "figure_validations": [
                    {"figure": "tam", "status": "validated", "source_count": 3},
                    {"figure": "sam", "status": "refuted", "source_count": 1, "refutation": "Overstated"},
                    {"figure": "som", "status": "unsupported", "source_count": 0}
                ],
                "sources": [
                    {"title": "Warehouse census", "publisher": "Gov", "url": "https://example.org/census", "date_accessed": "2025-03-10"}
                ]
            }),
        ),
        (
            market_sizing::SIZING,
            json!({
                "approach_used": "both",
                "top_down": figures(10e9),
                "bottom_up": figures(6e9),
                "comparison": {"tam_delta_pct": 40.0, "note": "Top-down higher", "warning": "Large gap"}
            }),
        ),
        (
            market_sizing::CHECKLIST,
            json!({
                "items": [
                    {"id": "sources_cited", "status": "pass"},
                    {"id": "som_realistic", "status": "fail"}
                ],
                "summary": {
                    "overall_status": "needs_work",
                    "pass": 1,
                    "fail": 1,
                    "failed_items": [{"id": "som_realistic", "label": "SOM realistic", "notes": "Too high"}]
                }
            }),
        ),
        (
            market_sizing::SENSITIVITY,
            json!({
                "scenarios": [
                    {
                        "parameter": "customer_count",
                        "confidence": "sourced",
                        "low_pct": -20,
                        "high_pct": 20,
                        "range_widened": false,
                        "effective_range": {"low_pct": -20, "high_pct": 20}
                    },
                    {
                        "parameter": "arpu",
                        "confidence": "unsupported",
                        "low_pct": -10,
                        "high_pct": 10,
                        "range_widened": true,
                        "effective_range": {"low_pct": -10, "high_pct": 10}
                    }
                ],
                "sensitivity_ranking": [
                    {"parameter": "customer_count", "impact": 0.4},
                    {"parameter": "arpu", "impact": 0.2}
                ],
                "most_sensitive": "customer_count"
            }),
        ),
    ];
    assert!(exercise(&market_sizing::PIPELINE, &fixture) > 1000);
}

#[test]
fn pointers_cover_nested_and_escaped_keys() {
    let document = json!({"a/b": [1, {"c~d": null}]});
    assert_eq!(
        pointers(&document),
        vec!["", "/a~1b", "/a~1b/0", "/a~1b/1", "/a~1b/1/c~0d"]
    );
}
