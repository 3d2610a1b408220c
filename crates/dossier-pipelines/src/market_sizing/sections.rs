use super::provenance::{Provenance, of_artifacts};
use super::{
    APPROACHES, CHECKLIST, FIGURES, INPUTS, METHODOLOGY, SENSITIVITY, SIZING, SizingCode,
    VALIDATION, approach_label, param_label,
};
use dossier_kernel::coerce::{
    as_dict, as_list, as_numeric_lenient, non_empty_str, number_or, objects, truthy,
};
use dossier_kernel::markdown::{
    block, display, fmt_number, fmt_usd, fmt_usd_value, generated_by, md_safe, placeholder, text,
    warnings_section,
};
use dossier_kernel::{ArtifactState, Section, SectionContext};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

type Ctx<'a> = SectionContext<'a, SizingCode>;

const AGENT: &str = "Market Sizing Agent";
const MONETARY_INPUTS: [&str; 4] = ["industry_total", "arpu", "tam", "sam"];
const MONETARY_ASSUMPTIONS: [&str; 2] = ["industry_total", "arpu"];

pub static SECTIONS: &[Section<SizingCode>] = &[
    Section {
        name: "title",
        render: title,
    },
    Section {
        name: "executive_summary",
        render: executive_summary,
    },
    Section {
        name: "analysis_checklist",
        render: analysis_checklist,
    },
    Section {
        name: "methodology",
        render: methodology,
    },
    Section {
        name: "definitions",
        render: definitions,
    },
    Section {
        name: "market_sizing",
        render: market_sizing,
    },
    Section {
        name: "assumptions",
        render: assumptions,
    },
    Section {
        name: "validation",
        render: validation,
    },
    Section {
        name: "sensitivity",
        render: sensitivity,
    },
    Section {
        name: "warnings",
        render: warnings,
    },
    Section {
        name: "sources",
        render: sources,
    },
];

fn confidence_label(category: &str) -> &str {
    match category {
        "sourced" => "Sourced",
        "derived" => "Derived",
        "agent_estimate" => "Estimate",
        other => other,
    }
}

/// Present approach objects in `sizing`, in report order.
fn approaches(sizing: &Map<String, Value>) -> impl Iterator<Item = (&'static str, &Map<String, Value>)> {
    APPROACHES
        .into_iter()
        .filter_map(|name| sizing.get(name).and_then(Value::as_object).map(|data| (name, data)))
}

fn figure<'a>(approach: &'a Map<String, Value>, name: &str) -> &'a Map<String, Value> {
    as_dict(approach.get(name))
}

fn figure_inputs<'a>(approach: &'a Map<String, Value>, name: &str) -> &'a Map<String, Value> {
    as_dict(figure(approach, name).get("inputs"))
}

fn title(ctx: &Ctx<'_>) -> Option<String> {
    let Some(inputs) = ctx.usable(INPUTS) else {
        return Some("# Market Sizing Report\n\n*No inputs artifact found.*\n".to_string());
    };
    let materials: Vec<String> = as_list(inputs.get("materials_provided"))
        .iter()
        .map(display)
        .collect();
    let materials = if materials.is_empty() {
        "none".to_string()
    } else {
        materials.join(", ")
    };
    Some(block(&[
        format!("# Market Sizing: {}\n", text(inputs, "company_name", "Unknown Company")),
        format!("**Date:** {}  ", text(inputs, "analysis_date", "unknown date")),
        format!("**Materials:** {materials}  "),
        generated_by(AGENT),
    ]))
}

/// Deck-claim notes for the executive summary, one per figure whose claim
/// diverges from our estimate.
fn deck_claim_notes(provenance: &Provenance) -> Vec<String> {
    let both = provenance.top_down.is_some() && provenance.bottom_up.is_some();
    let mut notes = Vec::new();
    for name in FIGURES {
        let mismatches: Vec<(&str, f64, f64)> = provenance
            .approaches()
            .filter_map(|(approach, data)| {
                let figure = data.figures().into_iter().find(|(f, _)| *f == name)?.1;
                let (claim, _) = figure.deck_mismatch()?;
                Some((approach_label(approach), figure.calculated, claim))
            })
            .collect();
        let Some(&(label, calculated, claim)) = mismatches.first() else {
            continue;
        };
        let metric = name.to_uppercase();
        let note = if both && mismatches.len() > 1 {
            let parts: Vec<String> = mismatches
                .iter()
                .map(|(label, value, _)| format!("{label}: {}", fmt_usd(*value)))
                .collect();
            format!(
                "Both {metric} estimates differ significantly from the deck's claim of {} ({}).",
                fmt_usd(claim),
                parts.join(", ")
            )
        } else if both {
            format!(
                "Our {} {metric} estimate differs significantly from the deck's claim ({} vs {}).",
                label.to_lowercase(),
                fmt_usd(calculated),
                fmt_usd(claim)
            )
        } else {
            format!(
                "Our {metric} estimate differs significantly from the deck's claim ({} vs {}).",
                fmt_usd(calculated),
                fmt_usd(claim)
            )
        };
        notes.push(format!("\n**Note:** {note}"));
    }
    notes
}

fn executive_summary(ctx: &Ctx<'_>) -> Option<String> {
    let Some(sizing) = ctx.usable(SIZING) else {
        return Some(placeholder("Executive Summary", "sizing data", ctx.state(SIZING)));
    };

    let mut lines = vec![
        "## Executive Summary\n".to_string(),
        "| Metric | Value | Method |".to_string(),
        "|--------|-------|--------|".to_string(),
    ];
    for (approach, data) in approaches(sizing) {
        for name in FIGURES {
            lines.push(format!(
                "| {} | {} | {} |",
                name.to_uppercase(),
                fmt_usd(number_or(figure(data, name).get("value"), 0.0)),
                approach_label(approach)
            ));
        }
    }

    if let Some(most) = ctx
        .usable(SENSITIVITY)
        .and_then(|sensitivity| non_empty_str(sensitivity.get("most_sensitive")))
    {
        lines.push(format!("| Most Sensitive Parameter | {} | — |", param_label(most)));
    }

    if let Some(provenance) = of_artifacts(ctx.artifacts) {
        lines.extend(deck_claim_notes(&provenance));
    }
    Some(block(&lines))
}

fn analysis_checklist(ctx: &Ctx<'_>) -> Option<String> {
    let mut lines = vec![
        "## Analysis Checklist\n".to_string(),
        format!("- Artifacts produced: {}", ctx.artifacts.found().join(", ")),
    ];
    if let Some(checklist) = ctx.usable(CHECKLIST) {
        let summary = as_dict(checklist.get("summary"));
        lines.push(format!(
            "- Self-check: {} pass, {} fail, {} N/A",
            text(summary, "pass", "0"),
            text(summary, "fail", "0"),
            text(summary, "not_applicable", "0"),
        ));
    }
    Some(block(&lines))
}

fn methodology(ctx: &Ctx<'_>) -> Option<String> {
    let Some(methodology) = ctx.usable(METHODOLOGY) else {
        return Some(placeholder("Methodology", "methodology", ctx.state(METHODOLOGY)));
    };
    let approach = text(methodology, "approach_chosen", "unknown");
    let label = match approach.as_str() {
        "both" => "Both (top-down and bottom-up cross-validation)",
        "top_down" => "Top-down",
        "bottom_up" => "Bottom-up",
        other => other,
    };
    let mut lines = vec!["## Methodology\n".to_string(), format!("**Approach:** {label}")];
    if truthy(methodology.get("rationale")) {
        lines.push(format!("**Rationale:** {}", text(methodology, "rationale", "")));
    }
    Some(block(&lines))
}

fn definitions(_ctx: &Ctx<'_>) -> Option<String> {
    Some(
        "## Definitions\n\n\
         - **TAM** (Total Addressable Market): Total market demand for the product/service \
         if 100% market share were achieved.\n\
         - **SAM** (Serviceable Available Market): The segment of TAM targeted by your products \
         and services that is within your geographical reach.\n\
         - **SOM** (Serviceable Obtainable Market): The portion of SAM that you can \
         realistically capture in the near term.\n"
            .to_string(),
    )
}

fn raw_or_unknown(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).map(display).unwrap_or_else(|| "?".to_string())
}

fn top_down_narrative(data: &Map<String, Value>) -> String {
    let tam = figure_inputs(data, "tam");
    let industry = if tam.contains_key("industry_total") {
        fmt_usd_value(tam.get("industry_total"))
    } else {
        "?".to_string()
    };
    format!(
        "**Top-down:** Starting from industry total of {industry}, targeting {}% segment \
         with {}% market share.\n",
        raw_or_unknown(figure_inputs(data, "sam"), "segment_pct"),
        raw_or_unknown(figure_inputs(data, "som"), "share_pct"),
    )
}

fn bottom_up_narrative(data: &Map<String, Value>) -> String {
    let tam = figure_inputs(data, "tam");
    let sam = figure_inputs(data, "sam");
    let som = figure_inputs(data, "som");
    let customers = match tam.get("customer_count") {
        Some(value @ Value::Number(_)) => fmt_number(value),
        Some(value) => display(value),
        None => "?".to_string(),
    };
    let arpu = if tam.contains_key("arpu") {
        fmt_usd_value(tam.get("arpu"))
    } else {
        "?".to_string()
    };
    let first_of = |key: &str| {
        tam.get(key)
            .or_else(|| match key {
                "serviceable_pct" => sam.get(key),
                _ => som.get(key),
            })
            .map(display)
            .unwrap_or_else(|| "?".to_string())
    };
    format!(
        "**Bottom-up:** {customers} potential customers x {arpu} ARPU, {}% serviceable, \
         {}% target capture.\n",
        first_of("serviceable_pct"),
        first_of("target_pct"),
    )
}

fn key_assumptions(inputs: &Map<String, Value>) -> String {
    inputs
        .iter()
        .map(|(param, value)| {
            let formatted = match value {
                Value::Number(_) if MONETARY_INPUTS.contains(&param.as_str()) => {
                    fmt_usd_value(Some(value))
                }
                other => fmt_number(other),
            };
            format!("{}: {formatted}", param_label(param))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn deck_claims_table(provenance: &Provenance) -> Vec<String> {
    let mut rows = Vec::new();
    for (approach, data) in provenance.approaches() {
        for (name, figure) in data.figures() {
            let claim = as_numeric_lenient(figure.deck_claim.as_ref());
            let (Some(claim), Some(delta)) = (claim, figure.delta_vs_deck_pct) else {
                continue;
            };
            rows.push(format!(
                "| {} ({}) | {} | {} | {delta:+.1}% | {} |",
                name.to_uppercase(),
                approach_label(approach),
                fmt_usd(claim),
                fmt_usd(figure.calculated),
                md_safe(figure.classification.as_str()),
            ));
        }
    }
    if rows.is_empty() {
        return rows;
    }
    let mut lines = vec![
        "\n### Deck Claims vs. Our Estimates\n".to_string(),
        "| Metric | Deck Claim | Our Estimate | Delta | Classification |".to_string(),
        "|--------|-----------|--------------|-------|----------------|".to_string(),
    ];
    lines.extend(rows);
    lines
}

fn market_sizing(ctx: &Ctx<'_>) -> Option<String> {
    let Some(sizing) = ctx.usable(SIZING) else {
        return Some(placeholder("Market Sizing", "sizing data", ctx.state(SIZING)));
    };
    let provenance = of_artifacts(ctx.artifacts).unwrap_or_default();

    let mut lines = vec!["## Market Sizing\n".to_string()];
    for (approach, data) in approaches(sizing) {
        if data.is_empty() {
            continue;
        }
        lines.push(match approach {
            "top_down" => top_down_narrative(data),
            _ => bottom_up_narrative(data),
        });
    }

    lines.push("| Metric | Value | Method | Provenance | Key Assumptions |".to_string());
    lines.push("|--------|-------|--------|------------|-----------------|".to_string());
    for (approach, data) in approaches(sizing) {
        for name in FIGURES {
            let figure_data = figure(data, name);
            let classification = provenance
                .approach(approach)
                .and_then(|p| p.figures().into_iter().find(|(f, _)| *f == name))
                .map(|(_, figure)| md_safe(figure.classification.as_str()))
                .unwrap_or_default();
            lines.push(format!(
                "| {} | {} | {} | {classification} | {} |",
                name.to_uppercase(),
                fmt_usd(number_or(figure_data.get("value"), 0.0)),
                approach_label(approach),
                key_assumptions(as_dict(figure_data.get("inputs"))),
            ));
        }
    }

    let comparison = sizing.get("comparison");
    if truthy(comparison) {
        let comparison = as_dict(comparison);
        let note = if truthy(comparison.get("warning")) {
            text(comparison, "warning", "")
        } else {
            text(comparison, "note", "")
        };
        lines.push(format!(
            "\n**Cross-validation:** TAM delta = {}%. {note}",
            text(comparison, "tam_delta_pct", "0")
        ));
    }

    lines.extend(deck_claims_table(&provenance));
    Some(block(&lines))
}

fn assumptions(ctx: &Ctx<'_>) -> Option<String> {
    let Some(validation) = ctx.usable(VALIDATION) else {
        return Some(placeholder("Assumptions", "validation data", ctx.state(VALIDATION)));
    };
    let entries: Vec<_> = objects(validation.get("assumptions")).collect();
    if entries.is_empty() {
        return Some("## Assumptions\n\n*No assumptions recorded.*\n".to_string());
    }

    let mut lines = vec!["## Assumptions\n".to_string()];
    for assumption in entries {
        let category = text(assumption, "category", "unknown");
        let name = text(assumption, "name", "unnamed");
        let value = match assumption.get("value") {
            Some(value @ Value::Number(_)) if MONETARY_ASSUMPTIONS.contains(&name.as_str()) => {
                fmt_usd_value(Some(value))
            }
            Some(value @ Value::Number(_)) => fmt_number(value),
            Some(other) => display(other),
            None => String::new(),
        };
        lines.push(format!(
            "- **{}** = {value} ({})",
            text(assumption, "label", &param_label(&name)),
            confidence_label(&category)
        ));
    }
    Some(block(&lines))
}

fn validation(ctx: &Ctx<'_>) -> Option<String> {
    let Some(validation) = ctx.usable(VALIDATION) else {
        return Some(placeholder("Validation", "validation data", ctx.state(VALIDATION)));
    };
    let figures: Vec<_> = objects(validation.get("figure_validations")).collect();
    if figures.is_empty() {
        return Some("## Validation\n\n*No figures validated.*\n".to_string());
    }

    let mut lines = vec!["## Validation\n".to_string()];
    for figure in figures {
        let name = non_empty_str(figure.get("label"))
            .map(str::to_string)
            .unwrap_or_else(|| text(figure, "figure", "unknown"));
        let count = number_or(figure.get("source_count"), 0.0);
        lines.push(format!(
            "- **{name}**: {} ({} source{})",
            text(figure, "status", "unknown"),
            text(figure, "source_count", "0"),
            if count == 1.0 { "" } else { "s" }
        ));
    }
    Some(block(&lines))
}

fn scenario_som(scenario: &Map<String, Value>, key: &str) -> String {
    fmt_usd(number_or(as_dict(scenario.get(key)).get("som"), 0.0))
}

fn sensitivity(ctx: &Ctx<'_>) -> Option<String> {
    let Some(sensitivity) = ctx.usable(SENSITIVITY) else {
        return Some(placeholder(
            "Sensitivity Analysis",
            "sensitivity analysis",
            ctx.state(SENSITIVITY),
        ));
    };
    let scenarios: Vec<_> = objects(sensitivity.get("scenarios")).collect();
    if scenarios.is_empty() {
        return Some("## Sensitivity Analysis\n\n*No scenarios analyzed.*\n".to_string());
    }

    let mut lines = vec![
        "## Sensitivity Analysis\n".to_string(),
        "The table below shows how SOM changes when each assumption moves between its low and \
         high estimate. Parameters tagged *Estimate* have wider ranges because they lack external \
         sourcing — they tend to dominate the sensitivity, which highlights exactly where better \
         data would most strengthen the analysis.\n"
            .to_string(),
    ];

    let with_approach = scenarios
        .iter()
        .any(|scenario| truthy(scenario.get("approach_used")));
    if with_approach {
        lines.push("| Parameter | Approach | Confidence | Low SOM | Base SOM | High SOM | Range |".to_string());
        lines.push("|-----------|----------|------------|---------|----------|----------|-------|".to_string());
    } else {
        lines.push("| Parameter | Confidence | Low SOM | Base SOM | High SOM | Range |".to_string());
        lines.push("|-----------|------------|---------|----------|----------|-------|".to_string());
    }

    for scenario in scenarios {
        let range = as_dict(scenario.get("effective_range"));
        let widened = if truthy(scenario.get("range_widened")) {
            " (widened)"
        } else {
            ""
        };
        let confidence = text(scenario, "confidence", "sourced");
        let mut cells = vec![param_label(&text(scenario, "parameter", "?"))];
        if with_approach {
            let approach = text(scenario, "approach_used", "?");
            cells.push(match approach.as_str() {
                "top_down" | "bottom_up" => approach_label(&approach).to_string(),
                _ => approach,
            });
        }
        cells.extend([
            confidence_label(&confidence).to_string(),
            scenario_som(scenario, "low"),
            scenario_som(scenario, "base"),
            scenario_som(scenario, "high"),
            format!(
                "[{}%, +{}%]{widened}",
                text(range, "low_pct", "0"),
                text(range, "high_pct", "0")
            ),
        ]);
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    if let Some(first) = objects(sensitivity.get("sensitivity_ranking")).next() {
        lines.push(format!(
            "\n**Most sensitive parameter:** {}",
            param_label(&text(first, "parameter", "?"))
        ));
    }
    Some(block(&lines))
}

fn warnings(ctx: &Ctx<'_>) -> Option<String> {
    warnings_section(ctx.findings)
}

fn source_line(source: &Map<String, Value>) -> String {
    let title = text(source, "title", "Untitled");
    let mut line = match non_empty_str(source.get("url")) {
        Some(url) => format!("- [{title}]({url})"),
        None => format!("- **{title}**"),
    };
    let mut meta = Vec::new();
    if let Some(publisher) = non_empty_str(source.get("publisher")) {
        meta.push(publisher.to_string());
    }
    if let Some(date) = non_empty_str(source.get("date_accessed")) {
        meta.push(format!("accessed {date}"));
    }
    if !meta.is_empty() {
        line.push_str(&format!(" ({})", meta.join(", ")));
    }
    if let Some(supported) = non_empty_str(source.get("supported")) {
        line.push_str(&format!(" — supports: {supported}"));
    }
    line
}

fn sources(ctx: &Ctx<'_>) -> Option<String> {
    let validation = match ctx.state(VALIDATION) {
        Some(ArtifactState::Present(validation)) => validation,
        Some(ArtifactState::Stub { .. }) => {
            return Some("## Sources Used\n\n*No sources — validation not performed.*\n".to_string());
        }
        state => return Some(placeholder("Sources Used", "validation data", state)),
    };
    let entries: Vec<_> = objects(validation.get("sources")).collect();
    if entries.is_empty() {
        return Some(
            "## Sources Used\n\nSources Used: none — pure calculation from user-provided inputs \
             (no market size claims to validate)\n"
                .to_string(),
        );
    }

    let mut seen = BTreeSet::new();
    let mut lines = vec!["## Sources Used\n".to_string()];
    for (i, source) in entries.into_iter().enumerate() {
        let key = non_empty_str(source.get("url"))
            .or_else(|| non_empty_str(source.get("title")))
            .map(str::to_string)
            .unwrap_or_else(|| format!("__unnamed_{i}"));
        if seen.insert(key) {
            lines.push(source_line(source));
        }
    }
    Some(block(&lines))
}
