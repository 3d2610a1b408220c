use super::{CONFLICT_CHECK, DISCUSSION, FUND_PROFILE, IcCode, SCORE_DIMENSIONS, STARTUP_PROFILE};
use dossier_kernel::coerce::{as_dict, as_list, category, non_empty_str, objects, truthy};
use dossier_kernel::markdown::{
    block, display, fmt_number, generated_by, humanize, placeholder, text, title_case,
    warnings_section,
};
use dossier_kernel::{Section, SectionContext};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

type Ctx<'a> = SectionContext<'a, IcCode>;

const AGENT: &str = "IC Simulation Agent";
const COACHING_LIMIT: usize = 10;

pub static SECTIONS: &[Section<IcCode>] = &[
    Section {
        name: "title",
        render: title,
    },
    Section {
        name: "executive_summary",
        render: executive_summary,
    },
    Section {
        name: "fund_profile",
        render: fund_profile,
    },
    Section {
        name: "conflict_check",
        render: conflict_check,
    },
    Section {
        name: "discussion_summary",
        render: discussion_summary,
    },
    Section {
        name: "dimension_scorecard",
        render: dimension_scorecard,
    },
    Section {
        name: "concerns_and_dealbreakers",
        render: concerns_and_dealbreakers,
    },
    Section {
        name: "diligence_requirements",
        render: diligence_requirements,
    },
    Section {
        name: "founder_coaching",
        render: founder_coaching,
    },
    Section {
        name: "warnings",
        render: warnings,
    },
];

/// Non-empty string field or `?`, title-cased.
fn titled_or_unknown(map: &Map<String, Value>, key: &str) -> String {
    title_case(non_empty_str(map.get(key)).unwrap_or("?"))
}

fn truthy_text(map: &Map<String, Value>, key: &str, default: &str) -> String {
    match map.get(key) {
        Some(value) if truthy(Some(value)) => display(value),
        _ => default.to_string(),
    }
}

fn label_or_id(item: &Map<String, Value>) -> String {
    text(item, "label", &text(item, "id", "?"))
}

fn title(ctx: &Ctx<'_>) -> Option<String> {
    let Some(profile) = ctx.usable(STARTUP_PROFILE) else {
        return Some("# IC Simulation Report\n\n*No startup profile found.*\n".to_string());
    };
    let stage = humanize(non_empty_str(profile.get("stage")).unwrap_or("unknown"));
    Some(format!(
        "# IC Simulation: {}\n\n**Date:** {} | **Stage:** {stage}  \n{}\n\n\
         > *This is an AI simulation. Partner verdicts, debate positions, and questions are \
         generated based on archetype personas and provided materials. They represent plausible \
         perspectives, not actual VC feedback.*\n",
        text(profile, "company_name", "Unknown Company"),
        text(profile, "simulation_date", "unknown date"),
        generated_by(AGENT),
    ))
}

fn verdict_label(verdict: &str) -> String {
    match verdict {
        "invest" => "Invest — strong enough for a term sheet discussion".to_string(),
        "more_diligence" => "More Diligence — promising but needs more evidence".to_string(),
        "pass" => "Pass — too many concerns to proceed at this time".to_string(),
        "hard_pass" => "Hard Pass — fatal flaw identified".to_string(),
        other => other.to_string(),
    }
}

fn executive_summary(ctx: &Ctx<'_>) -> Option<String> {
    let mut lines = vec!["## Executive Summary\n".to_string()];

    if let Some(profile) = ctx.usable(STARTUP_PROFILE) {
        lines.push(format!("**Company:** {}", text(profile, "company_name", "?")));
        lines.push(format!("**One-liner:** {}", text(profile, "one_liner", "?")));
        lines.push(format!("**Sector:** {}", text(profile, "sector", "?")));
    }

    let score_summary = ctx
        .usable(SCORE_DIMENSIONS)
        .map(|scores| as_dict(scores.get("summary")));
    if let Some(summary) = score_summary {
        let verdict = text(summary, "verdict", "unknown");
        lines.push(format!(
            "**Conviction Score:** {}% — {}",
            text(summary, "conviction_score", "0"),
            verdict_label(&verdict)
        ));
        lines.push(format!(
            "**Breakdown:** {} strong, {} moderate, {} concern, {} dealbreaker",
            text(summary, "strong_conviction", "0"),
            text(summary, "moderate_conviction", "0"),
            text(summary, "concern", "0"),
            text(summary, "dealbreaker", "0"),
        ));
    }

    let discussion = ctx.usable(DISCUSSION);
    if let Some(discussion) = discussion {
        let split: Vec<String> = objects(discussion.get("partner_verdicts"))
            .map(|pv| {
                format!(
                    "{}: {}",
                    titled_or_unknown(pv, "partner"),
                    truthy_text(pv, "verdict", "?")
                )
            })
            .collect();
        if !split.is_empty() {
            lines.push(format!("**Partner Split:** {}", split.join(" | ")));
        }
    }

    if let (Some(summary), Some(discussion)) = (score_summary, discussion) {
        let consensus = category(discussion.get("consensus_verdict"));
        let scored = category(summary.get("verdict"));
        if !consensus.is_empty() && !scored.is_empty() && consensus != scored {
            lines.push(String::new());
            lines.push(format!(
                "> **Note:** The IC discussion consensus (*{}*) differs from the quantitative \
                 score verdict (*{}*). This can occur when qualitative debate conclusions \
                 override borderline numeric scores.",
                text(discussion, "consensus_verdict", ""),
                text(summary, "verdict", ""),
            ));
        }
    }

    Some(block(&lines))
}

fn fund_profile(ctx: &Ctx<'_>) -> Option<String> {
    let Some(fund) = ctx.usable(FUND_PROFILE) else {
        return Some(placeholder("Fund Profile", "fund profile", ctx.state(FUND_PROFILE)));
    };

    let mut lines = vec![
        "## Fund Profile\n".to_string(),
        format!("**Fund:** {}", text(fund, "fund_name", "?")),
        format!("**Mode:** {}", text(fund, "mode", "?")),
    ];

    let thesis = as_list(fund.get("thesis_areas"));
    if !thesis.is_empty() {
        let areas: Vec<String> = thesis.iter().map(display).collect();
        lines.push(format!("**Thesis Areas:** {}", areas.join(", ")));
    }

    let check_size = as_dict(fund.get("check_size_range"));
    if !check_size.is_empty() {
        let bound = |key: &str| match check_size.get(key) {
            None | Some(Value::Null) => "?".to_string(),
            Some(value) => fmt_number(value),
        };
        lines.push(format!(
            "**Check Size:** {} {} - {}",
            text(check_size, "currency", "USD"),
            bound("min"),
            bound("max"),
        ));
    }

    let archetypes: Vec<_> = objects(fund.get("archetypes")).collect();
    if !archetypes.is_empty() {
        lines.push("\n**Partners:**".to_string());
        for archetype in archetypes {
            lines.push(format!(
                "- **{}** ({}): {}",
                text(archetype, "name", "?"),
                title_case(&text(archetype, "role", "?")),
                text(archetype, "background", "?"),
            ));
        }
    }

    Some(block(&lines))
}

fn conflict_check(ctx: &Ctx<'_>) -> Option<String> {
    let Some(conflict) = ctx.usable(CONFLICT_CHECK) else {
        return Some(placeholder("Conflict Check", "conflict check", ctx.state(CONFLICT_CHECK)));
    };
    let summary = as_dict(conflict.get("summary"));

    let mut lines = vec![
        "## Conflict Check\n".to_string(),
        format!(
            "**Portfolio Companies Checked:** {}",
            text(summary, "total_checked", "?")
        ),
        format!("**Conflicts Found:** {}", text(summary, "conflict_count", "0")),
        format!("**Overall Severity:** {}", text(summary, "overall_severity", "?")),
    ];

    let conflicts: Vec<_> = objects(conflict.get("conflicts")).collect();
    if !conflicts.is_empty() {
        lines.push(String::new());
        for c in conflicts {
            lines.push(format!(
                "- **[{}]** {} ({}): {}",
                text(c, "severity", "?").to_uppercase(),
                text(c, "company", "?"),
                text(c, "type", "?"),
                text(c, "rationale", "?"),
            ));
        }
    }

    Some(block(&lines))
}

fn discussion_summary(ctx: &Ctx<'_>) -> Option<String> {
    let Some(discussion) = ctx.usable(DISCUSSION) else {
        return Some(placeholder("Discussion Summary", "discussion", ctx.state(DISCUSSION)));
    };

    let mut lines = vec![
        "## Discussion Summary\n".to_string(),
        format!("**Assessment Mode:** {}", text(discussion, "assessment_mode", "?")),
        format!("**Consensus Verdict:** {}", text(discussion, "consensus_verdict", "?")),
    ];

    for pv in objects(discussion.get("partner_verdicts")) {
        lines.push(format!(
            "\n### {}: {}",
            titled_or_unknown(pv, "partner"),
            truthy_text(pv, "verdict", "?")
        ));
        let rationale = truthy_text(pv, "rationale", "");
        if !rationale.is_empty() {
            lines.push(format!("\n{rationale}"));
        }
    }

    let debates: Vec<_> = objects(discussion.get("debate_sections")).collect();
    if !debates.is_empty() {
        lines.push("\n### Key Debates\n".to_string());
        for debate in debates {
            lines.push(format!("**{}**\n", text(debate, "topic", "?")));
            for exchange in objects(debate.get("exchanges")) {
                lines.push(format!(
                    "> **{}:** {}\n",
                    titled_or_unknown(exchange, "partner"),
                    truthy_text(exchange, "position", "")
                ));
            }
        }
    }

    Some(block(&lines))
}

fn status_marker(status: &str) -> &'static str {
    match status {
        "strong_conviction" => "STRONG",
        "moderate_conviction" => "MODERATE",
        "concern" => "CONCERN",
        "dealbreaker" => "DEALBREAKER",
        "not_applicable" => "N/A",
        _ => "?",
    }
}

fn dimension_scorecard(ctx: &Ctx<'_>) -> Option<String> {
    let Some(scores) = ctx.usable(SCORE_DIMENSIONS) else {
        return Some(placeholder(
            "Dimension Scorecard",
            "scorecard",
            ctx.state(SCORE_DIMENSIONS),
        ));
    };
    let summary = as_dict(scores.get("summary"));

    let mut lines = vec![
        "## Dimension Scorecard\n".to_string(),
        "*Dimension scores reflect the agent's assessment calibrated against \
         stage-appropriate benchmarks. All scores are agent-generated.*\n"
            .to_string(),
        "| Category | Strong | Moderate | Concern | Dealbreaker | N/A |".to_string(),
        "|----------|--------|----------|---------|-------------|-----|".to_string(),
    ];
    for (category, counts) in as_dict(summary.get("by_category")) {
        let counts = as_dict(Some(counts));
        lines.push(format!(
            "| {category} | {} | {} | {} | {} | {} |",
            text(counts, "strong_conviction", "0"),
            text(counts, "moderate_conviction", "0"),
            text(counts, "concern", "0"),
            text(counts, "dealbreaker", "0"),
            text(counts, "not_applicable", "0"),
        ));
    }
    lines.push(String::new());

    lines.push("| # | Category | Dimension | Status |".to_string());
    lines.push("|---|----------|-----------|--------|".to_string());
    for (i, item) in objects(scores.get("items")).enumerate() {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            i + 1,
            text(item, "category", "?"),
            label_or_id(item),
            status_marker(&text(item, "status", "?")),
        ));
    }

    Some(block(&lines))
}

fn flagged_list(lines: &mut Vec<String>, heading: &str, entries: &[&Map<String, Value>]) {
    if entries.is_empty() {
        return;
    }
    lines.push(heading.to_string());
    for entry in entries {
        lines.push(format!(
            "- **{}** ({})",
            label_or_id(entry),
            text(entry, "category", "?")
        ));
        let notes = truthy_text(entry, "notes", "");
        if !notes.is_empty() {
            lines.push(format!("  - {notes}"));
        }
    }
    lines.push(String::new());
}

fn concerns_and_dealbreakers(ctx: &Ctx<'_>) -> Option<String> {
    let summary = as_dict(ctx.usable(SCORE_DIMENSIONS)?.get("summary"));
    let dealbreakers: Vec<_> = objects(summary.get("dealbreakers")).collect();
    let concerns: Vec<_> = objects(summary.get("top_concerns")).collect();
    if dealbreakers.is_empty() && concerns.is_empty() {
        return None;
    }

    let mut lines = vec!["## Concerns and Dealbreakers\n".to_string()];
    flagged_list(&mut lines, "### Dealbreakers\n", &dealbreakers);
    flagged_list(&mut lines, "### Key Concerns\n", &concerns);
    Some(block(&lines))
}

fn diligence_requirements(ctx: &Ctx<'_>) -> Option<String> {
    let requirements = as_list(ctx.usable(DISCUSSION)?.get("diligence_requirements"));
    if requirements.is_empty() {
        return None;
    }
    let mut lines = vec!["## Diligence Requirements\n".to_string()];
    for (i, requirement) in requirements.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, display(requirement)));
    }
    Some(block(&lines))
}

fn dealbreaker_coaching(scores: &Map<String, Value>) -> Vec<String> {
    let items_by_id: BTreeMap<&str, &Map<String, Value>> = objects(scores.get("items"))
        .filter_map(|item| non_empty_str(item.get("id")).map(|id| (id, item)))
        .collect();

    objects(as_dict(scores.get("summary")).get("dealbreakers"))
        .map(|dealbreaker| {
            let mut evidence = truthy_text(dealbreaker, "evidence", "");
            if evidence.is_empty() {
                evidence = non_empty_str(dealbreaker.get("id"))
                    .and_then(|id| items_by_id.get(id))
                    .map(|item| truthy_text(item, "evidence", ""))
                    .unwrap_or_default();
            }
            let mut entry = format!("CRITICAL — **{}**", text(dealbreaker, "label", "?"));
            if !evidence.is_empty() {
                entry.push_str(&format!(": {evidence}"));
            }
            entry.push_str(" **Prepare:** Gather specific evidence to address this before your next IC.");
            entry
        })
        .collect()
}

fn founder_coaching(ctx: &Ctx<'_>) -> Option<String> {
    let mut lines = vec![
        "## Founder Coaching\n".to_string(),
        "Prepare for these areas before your next investor meeting:\n".to_string(),
    ];

    let mut entries = ctx
        .usable(SCORE_DIMENSIONS)
        .map(dealbreaker_coaching)
        .unwrap_or_default();
    if let Some(discussion) = ctx.usable(DISCUSSION) {
        entries.extend(
            as_list(discussion.get("key_concerns"))
                .iter()
                .map(|concern| format!("Address this concern proactively: {}", display(concern))),
        );
    }

    if entries.is_empty() {
        lines.push("No specific coaching items identified.\n".to_string());
    } else {
        for (i, entry) in entries.iter().take(COACHING_LIMIT).enumerate() {
            lines.push(format!("{}. {entry}", i + 1));
        }
        lines.push(String::new());
    }
    Some(block(&lines))
}

fn warnings(ctx: &Ctx<'_>) -> Option<String> {
    warnings_section(ctx.findings)
}
