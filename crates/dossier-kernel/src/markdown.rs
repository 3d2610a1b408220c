//! Markdown rendering helpers shared by every pipeline's sections.

use crate::artifact::ArtifactState;
use crate::finding::{Finding, RuleCode};
use serde_json::{Map, Value};

const FOUNDER_SKILLS_LINK: &str = "[founder skills](https://github.com/lool-ventures/founder-skills)";
const LOOL_LINK: &str = "[lool ventures](https://lool.vc)";

/// Attribution line used under report titles.
pub fn generated_by(agent: &str) -> String {
    format!("**Generated by:** {FOUNDER_SKILLS_LINK} by {LOOL_LINK} — {agent}")
}

/// Closing attribution appended after the last section.
pub fn footer(agent: &str) -> String {
    format!("\n---\n*Generated by {FOUNDER_SKILLS_LINK} by {LOOL_LINK} — {agent}*\n")
}

/// Fixed-point formatting with comma thousands separators.
pub fn group_fixed(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (unsigned, None),
    };
    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3);
    out.push_str(sign);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Currency with B/M/K suffixes above a thousand: `$1.2B`, `$350.0K`,
/// `$999.00`.
pub fn fmt_usd(value: f64) -> String {
    if value >= 1_000_000_000.0 {
        format!("${}B", group_fixed(value / 1_000_000_000.0, 1))
    } else if value >= 1_000_000.0 {
        format!("${}M", group_fixed(value / 1_000_000.0, 1))
    } else if value >= 1_000.0 {
        format!("${}K", group_fixed(value / 1_000.0, 1))
    } else {
        format!("${}", group_fixed(value, 2))
    }
}

/// Currency for an untrusted value; non-numbers render as zero.
pub fn fmt_usd_value(value: Option<&Value>) -> String {
    fmt_usd(value.and_then(Value::as_f64).unwrap_or(0.0))
}

/// Numbers with separators and no needless decimals; other values as text.
pub fn fmt_number(value: &Value) -> String {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            group_fixed(n.as_f64().unwrap_or_default(), 0)
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => group_fixed(f, 0),
            Some(f) => group_fixed(f, 2),
            None => n.to_string(),
        },
        other => display(other),
    }
}

/// Plain-text rendering of a scalar. Strings are unquoted, null is empty,
/// and containers fall back to compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `map[key]` rendered as text, or `default` when absent or null.
pub fn text(map: &Map<String, Value>, key: &str, default: &str) -> String {
    match map.get(key) {
        None | Some(Value::Null) => default.to_string(),
        Some(value) => display(value),
    }
}

/// Like [`text`] but also treats empty strings as absent.
pub fn text_nonempty(map: &Map<String, Value>, key: &str, default: &str) -> String {
    let rendered = text(map, key, default);
    if rendered.is_empty() {
        default.to_string()
    } else {
        rendered
    }
}

/// Bracketed, quoted list used inside finding messages: `['a', 'b']`.
pub fn bracket_list<S: AsRef<str>>(items: &[S]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("'{}'", item.as_ref()))
        .collect();
    format!("[{}]", quoted.join(", "))
}

/// Escape a value for use inside a table cell.
pub fn md_safe(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_alpha = false;
    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// `pre_seed` -> `Pre Seed`.
pub fn humanize(raw: &str) -> String {
    title_case(&raw.replace('_', " "))
}

/// Lines joined by newlines with a trailing newline, the shape every
/// section returns.
pub fn block(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Section body shown when the artifact a section depends on cannot be
/// used. `subject` names the artifact in prose, e.g. "stage profile".
pub fn placeholder(heading: &str, subject: &str, state: Option<&ArtifactState>) -> String {
    let body = match state {
        Some(ArtifactState::Corrupt { .. }) => {
            format!("*{} could not be read: invalid JSON.*", capitalize(subject))
        }
        Some(ArtifactState::Stub { reason }) => format!(
            "*{} not performed — {}*",
            capitalize(subject),
            reason.as_deref().unwrap_or("unknown reason")
        ),
        _ => format!("*No {subject} available.*"),
    };
    format!("## {heading}\n\n{body}\n")
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The warnings section; `None` when there is nothing to report.
pub fn warnings_section<C: RuleCode>(findings: &[Finding<C>]) -> Option<String> {
    if findings.is_empty() {
        return None;
    }
    let mut lines = vec!["## Warnings\n".to_string()];
    for finding in findings {
        lines.push(format!(
            "- [{}] **{}:** {}",
            finding.severity.icon(),
            finding.code.label(),
            finding.message
        ));
    }
    Some(block(&lines))
}
