use super::{CHECKLIST, DECK_INVENTORY, DeckCode, SLIDE_REVIEWS, STAGE_PROFILE};
use dossier_kernel::coerce::{as_dict, as_list, as_str, objects, truthy};
use dossier_kernel::markdown::{
    block, display, generated_by, humanize, placeholder, text, text_nonempty, warnings_section,
};
use dossier_kernel::{Section, SectionContext};
use serde_json::{Map, Value};

type Ctx<'a> = SectionContext<'a, DeckCode>;

const AGENT: &str = "Deck Review Agent";
const PRIORITY_FIX_LIMIT: usize = 5;

pub static SECTIONS: &[Section<DeckCode>] = &[
    Section {
        name: "title",
        render: title,
    },
    Section {
        name: "executive_summary",
        render: executive_summary,
    },
    Section {
        name: "stage_context",
        render: stage_context,
    },
    Section {
        name: "slide_feedback",
        render: slide_feedback,
    },
    Section {
        name: "checklist_results",
        render: checklist_results,
    },
    Section {
        name: "priority_fixes",
        render: priority_fixes,
    },
    Section {
        name: "warnings",
        render: warnings,
    },
    Section {
        name: "full_checklist",
        render: full_checklist,
    },
];

fn label_or_id(item: &Map<String, Value>) -> String {
    text(item, "label", &text(item, "id", "?"))
}

fn title(ctx: &Ctx<'_>) -> Option<String> {
    let Some(inventory) = ctx.usable(DECK_INVENTORY) else {
        return Some("# Pitch Deck Review\n\n*No deck inventory found.*\n".to_string());
    };
    Some(format!(
        "# Pitch Deck Review: {}\n\n**Date:** {} | **Slides:** {} | **Format:** {}  \n{}\n",
        text(inventory, "company_name", "Unknown Company"),
        text(inventory, "review_date", "unknown date"),
        text(inventory, "total_slides", "?"),
        text(inventory, "input_format", "unknown"),
        generated_by(AGENT),
    ))
}

fn status_label(status: &str) -> String {
    match status {
        "strong" => "Strong — your deck is investor-ready with minor polish".to_string(),
        "solid" => {
            "Solid — good foundation, a few targeted improvements will make this shine".to_string()
        }
        "needs_work" => "Needs Work — the business may be strong but the deck has gaps to close \
                         before sending"
            .to_string(),
        "major_revision" => {
            "Major Revision — worth reworking before it goes out; see priority fixes below"
                .to_string()
        }
        other => other.to_string(),
    }
}

fn executive_summary(ctx: &Ctx<'_>) -> Option<String> {
    let mut lines = vec!["## Executive Summary\n".to_string()];

    if let Some(profile) = ctx.usable(STAGE_PROFILE) {
        let stage = humanize(&text_nonempty(profile, "detected_stage", "unknown"));
        lines.push(format!(
            "**Stage:** {stage} (confidence: {})",
            text(profile, "confidence", "unknown")
        ));
        if truthy(profile.get("is_ai_company")) {
            lines.push("**AI Company:** Yes".to_string());
        }
    }

    if let Some(inventory) = ctx.usable(DECK_INVENTORY) {
        lines.push(format!("**Slide Count:** {}", text(inventory, "total_slides", "?")));
    }

    if let Some(checklist) = ctx.usable(CHECKLIST) {
        let summary = as_dict(checklist.get("summary"));
        let status = text(summary, "overall_status", "unknown");
        lines.push(format!(
            "**Overall Score:** {}% — {}",
            text(summary, "score_pct", "0"),
            status_label(&status)
        ));
        lines.push(format!(
            "**Breakdown:** {} pass, {} fail, {} warn, {} N/A",
            text(summary, "pass", "0"),
            text(summary, "fail", "0"),
            text(summary, "warn", "0"),
            text(summary, "not_applicable", "0"),
        ));
    }

    Some(block(&lines))
}

fn stage_context(ctx: &Ctx<'_>) -> Option<String> {
    let Some(profile) = ctx.usable(STAGE_PROFILE) else {
        return Some(placeholder("Stage Context", "stage profile", ctx.state(STAGE_PROFILE)));
    };

    let mut lines = vec!["## Stage Context\n".to_string()];
    lines.push(format!(
        "**Detected Stage:** {}\n",
        humanize(&text(profile, "detected_stage", "unknown"))
    ));

    let evidence = as_list(profile.get("evidence"));
    if !evidence.is_empty() {
        lines.push("**Evidence:**".to_string());
        lines.extend(evidence.iter().map(|e| format!("- {}", display(e))));
        lines.push(String::new());
    }

    let benchmarks = as_dict(profile.get("stage_benchmarks"));
    if !benchmarks.is_empty() {
        lines.push(format!(
            "**Typical Round Size:** {}",
            text(benchmarks, "round_size_range", "N/A")
        ));
        lines.push(format!(
            "**Expected Traction:** {}",
            text(benchmarks, "expected_traction", "N/A")
        ));
        lines.push(format!(
            "**Runway Expectation:** {}",
            text(benchmarks, "runway_expectation", "N/A")
        ));
    }

    lines.push(
        "\n*Stage benchmarks are reference data from industry standards \
         (Sequoia, DocSend, YC, a16z, Carta). They represent typical ranges, not recommendations.*"
            .to_string(),
    );
    Some(block(&lines))
}

fn bullets(lines: &mut Vec<String>, heading: &str, items: &[Value]) {
    if items.is_empty() {
        return;
    }
    lines.push(heading.to_string());
    lines.extend(items.iter().map(|item| format!("- {}", display(item))));
}

fn slide_feedback(ctx: &Ctx<'_>) -> Option<String> {
    let Some(reviews) = ctx.usable(SLIDE_REVIEWS) else {
        return Some(placeholder(
            "Slide-by-Slide Feedback",
            "slide reviews",
            ctx.state(SLIDE_REVIEWS),
        ));
    };

    let mut lines = vec![
        "## Slide-by-Slide Feedback\n".to_string(),
        "*Each slide assessment is the agent's evaluation against best-practice frameworks. \
         Strengths and weaknesses are the agent's analysis, not investor quotes.*\n"
            .to_string(),
    ];

    for review in objects(reviews.get("reviews")) {
        lines.push(format!(
            "### Slide {} ({})\n",
            text(review, "slide_number", "?"),
            text(review, "maps_to", "unknown")
        ));
        bullets(&mut lines, "**What's working:**", as_list(review.get("strengths")));
        bullets(
            &mut lines,
            "**What investors will question:**",
            as_list(review.get("weaknesses")),
        );
        let recommendations = as_list(review.get("recommendations"));
        if !recommendations.is_empty() {
            lines.push(String::new());
            bullets(&mut lines, "**How to fix:**", recommendations);
        }
        lines.push(String::new());
    }

    let missing: Vec<_> = objects(reviews.get("missing_slides")).collect();
    if !missing.is_empty() {
        lines.push("### Slides to Add\n".to_string());
        lines.push("Investors at your stage will expect these:\n".to_string());
        for slide in missing {
            lines.push(format!(
                "- **[{}]** {}: {}",
                text(slide, "importance", "important").to_uppercase(),
                text(slide, "expected_type", "unknown"),
                text(slide, "recommendation", ""),
            ));
        }
        lines.push(String::new());
    }

    let narrative = text(reviews, "overall_narrative_assessment", "");
    if !narrative.is_empty() {
        lines.push(format!("### Overall Narrative\n\n{narrative}\n"));
    }

    Some(block(&lines))
}

fn checklist_results(ctx: &Ctx<'_>) -> Option<String> {
    let Some(checklist) = ctx.usable(CHECKLIST) else {
        return Some(placeholder("Checklist Results", "checklist data", ctx.state(CHECKLIST)));
    };
    let summary = as_dict(checklist.get("summary"));

    let mut lines = vec![
        "## Checklist Results\n".to_string(),
        "| Category | Pass | Fail | Warn | N/A |".to_string(),
        "|----------|------|------|------|-----|".to_string(),
    ];
    for (category, counts) in as_dict(summary.get("by_category")) {
        let counts = as_dict(Some(counts));
        lines.push(format!(
            "| {category} | {} | {} | {} | {} |",
            text(counts, "pass", "0"),
            text(counts, "fail", "0"),
            text(counts, "warn", "0"),
            text(counts, "not_applicable", "0"),
        ));
    }
    lines.push(String::new());

    let failed: Vec<_> = objects(summary.get("failed_items")).collect();
    if !failed.is_empty() {
        lines.push("### Areas That Need Attention\n".to_string());
        for item in failed {
            lines.push(format!(
                "- **{}** ({})",
                label_or_id(item),
                text(item, "category", "?")
            ));
            let notes = text(item, "notes", "");
            if !notes.is_empty() {
                lines.push(format!("  - {notes}"));
            }
            let evidence = text(item, "evidence", "");
            if !evidence.is_empty() {
                lines.push(format!("  - *Basis: {evidence}*"));
            }
        }
        lines.push(String::new());
    }

    let warned: Vec<_> = objects(summary.get("warned_items")).collect();
    if !warned.is_empty() {
        lines.push("### Items Needing Attention\n".to_string());
        for item in warned {
            lines.push(format!(
                "- **{}** ({})",
                label_or_id(item),
                text(item, "category", "?")
            ));
            let notes = text(item, "notes", "");
            if !notes.is_empty() {
                lines.push(format!("  - {notes}"));
            }
        }
        lines.push(String::new());
    }

    Some(block(&lines))
}

fn fix_line(item: &Map<String, Value>) -> String {
    let label = label_or_id(item);
    let notes = text(item, "notes", "");
    if notes.is_empty() {
        label
    } else {
        format!("{label}: {notes}")
    }
}

fn priority_fixes(ctx: &Ctx<'_>) -> Option<String> {
    let mut lines = vec![
        "## Top 5 Priority Fixes\n".to_string(),
        "These are the changes that will have the biggest impact on investor response:\n"
            .to_string(),
    ];

    let summary = ctx
        .usable(CHECKLIST)
        .map(|checklist| as_dict(checklist.get("summary")));
    let mut fixes: Vec<String> = Vec::new();

    if let Some(summary) = summary {
        fixes.extend(objects(summary.get("failed_items")).map(fix_line));
    }
    if let Some(reviews) = ctx.usable(SLIDE_REVIEWS) {
        fixes.extend(
            objects(reviews.get("missing_slides"))
                .filter(|slide| as_str(slide.get("importance")) == Some("critical"))
                .map(|slide| {
                    format!(
                        "Add missing {}: {}",
                        text(slide, "expected_type", "slide"),
                        text(slide, "recommendation", "")
                    )
                }),
        );
    }
    if let Some(summary) = summary {
        fixes.extend(objects(summary.get("warned_items")).map(fix_line));
    }

    if fixes.is_empty() {
        lines.push("No critical fixes identified.\n".to_string());
    } else {
        for (i, fix) in fixes.iter().take(PRIORITY_FIX_LIMIT).enumerate() {
            lines.push(format!("{}. {fix}", i + 1));
        }
        lines.push(String::new());
    }
    Some(block(&lines))
}

fn warnings(ctx: &Ctx<'_>) -> Option<String> {
    warnings_section(ctx.findings)
}

fn status_marker(status: &str) -> &'static str {
    match status {
        "pass" => "PASS",
        "fail" => "FAIL",
        "warn" => "WARN",
        "not_applicable" => "N/A",
        _ => "?",
    }
}

fn full_checklist(ctx: &Ctx<'_>) -> Option<String> {
    let checklist = ctx.usable(CHECKLIST)?;
    let items: Vec<_> = objects(checklist.get("items")).collect();
    if items.is_empty() {
        return None;
    }

    let mut lines = vec![
        "## Appendix: Full Checklist\n".to_string(),
        "| # | Category | Criterion | Status |".to_string(),
        "|---|----------|-----------|--------|".to_string(),
    ];
    for (i, item) in items.into_iter().enumerate() {
        lines.push(format!(
            "| {} | {} | {} | {} |",
            i + 1,
            text(item, "category", "?"),
            label_or_id(item),
            status_marker(as_str(item.get("status")).unwrap_or("?")),
        ));
    }
    Some(block(&lines))
}
