//! Report composition: registry evaluation, acceptance resolution, section
//! rendering and the validation result.

use crate::acceptance::{DirectiveRejection, parse_directives, resolve};
use crate::artifact::{ArtifactSet, ArtifactSpec, ArtifactState};
use crate::error::Result;
use crate::finding::{Finding, RuleCode, SeverityCounts};
use crate::markdown::footer;
use crate::registry::{RuleContext, RuleRegistry};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Static description of a pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PipelineDescriptor {
    /// Subcommand name, e.g. `deck-review`.
    pub name: &'static str,
    /// Attribution used in titles and the footer.
    pub agent: &'static str,
    /// Declared artifacts in load order.
    pub artifacts: &'static [ArtifactSpec],
    /// Artifact whose `accepted_warnings` hold acceptance directives.
    pub acceptance_owner: &'static str,
}

/// What a section may read while rendering.
pub struct SectionContext<'a, C> {
    pub artifacts: &'a ArtifactSet,
    /// Findings after acceptance resolution.
    pub findings: &'a [Finding<C>],
    pub as_of: NaiveDate,
}

impl<'a, C> SectionContext<'a, C> {
    pub fn state(&self, name: &str) -> Option<&'a ArtifactState> {
        self.artifacts.state(name)
    }

    pub fn usable(&self, name: &str) -> Option<&'a Map<String, Value>> {
        self.artifacts.usable(name)
    }
}

/// A section renderer. `None` (or an empty string) omits the section.
pub type RenderFn<C> = fn(&SectionContext<'_, C>) -> Option<String>;

pub struct Section<C: 'static> {
    pub name: &'static str,
    pub render: RenderFn<C>,
}

/// Extra structured output attached next to `validation`.
pub type SupplementFn = fn(&ArtifactSet) -> Option<Value>;

/// A complete pipeline: artifacts, rules in order, sections in order.
pub struct Pipeline<C: 'static> {
    pub descriptor: PipelineDescriptor,
    pub registry: RuleRegistry<C>,
    pub sections: &'static [Section<C>],
    pub supplement: Option<SupplementFn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComposeOptions {
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Clean,
    Warnings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult<C> {
    pub status: ValidationStatus,
    pub warnings: Vec<Finding<C>>,
    pub artifacts_found: Vec<String>,
    pub artifacts_missing: Vec<String>,
}

/// The output of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition<C> {
    pub report_markdown: String,
    pub validation: ValidationResult<C>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Value>,
    #[serde(skip)]
    pub rejected_directives: Vec<DirectiveRejection>,
    #[serde(skip)]
    pub artifacts_declared: usize,
}

impl<C: RuleCode> Pipeline<C> {
    pub fn load(&self, dir: &Path) -> ArtifactSet {
        ArtifactSet::load(dir, self.descriptor.artifacts)
    }

    pub fn compose(&self, artifacts: &ArtifactSet, options: &ComposeOptions) -> Composition<C> {
        let ctx = RuleContext::new(artifacts, options.as_of);
        let mut findings = self.registry.evaluate(&ctx);

        let mut rejected_directives = Vec::new();
        if let Some(owner) = artifacts.usable(self.descriptor.acceptance_owner) {
            let parsed = parse_directives::<C>(owner);
            let acknowledged = resolve(&mut findings, &parsed.accepted);
            tracing::debug!(
                pipeline = self.descriptor.name,
                directives = parsed.accepted.len(),
                acknowledged,
                "applied acceptance directives"
            );
            rejected_directives = parsed.rejected;
        }

        let status = if findings.is_empty() {
            ValidationStatus::Clean
        } else {
            ValidationStatus::Warnings
        };

        let section_ctx = SectionContext {
            artifacts,
            findings: &findings,
            as_of: options.as_of,
        };
        let rendered: Vec<String> = self
            .sections
            .iter()
            .filter_map(|section| (section.render)(&section_ctx))
            .filter(|body| !body.is_empty())
            .collect();
        let mut report_markdown = rendered.join("\n");
        report_markdown.push_str(&footer(self.descriptor.agent));

        let provenance = self.supplement.and_then(|supplement| supplement(artifacts));

        Composition {
            report_markdown,
            validation: ValidationResult {
                status,
                warnings: findings,
                artifacts_found: artifacts.found(),
                artifacts_missing: artifacts.missing(),
            },
            provenance,
            rejected_directives,
            artifacts_declared: artifacts.len(),
        }
    }
}

impl<C: RuleCode> Composition<C> {
    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts::of(&self.validation.warnings)
    }

    /// True when a strict run must fail: some high or medium finding
    /// survived acceptance.
    pub fn blocks_strict(&self) -> bool {
        self.validation
            .warnings
            .iter()
            .any(|finding| finding.severity.is_blocking())
    }

    /// Serialized payload with a trailing newline.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let mut out = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        out.push('\n');
        Ok(out)
    }

    /// Human summary for stderr.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Artifacts found: {}/{}",
            self.validation.artifacts_found.len(),
            self.artifacts_declared
        )];
        if self.validation.warnings.is_empty() {
            lines.push("No warnings.".to_string());
            return lines;
        }
        let counts = self.counts();
        lines.push(format!(
            "Warnings: {} high, {} medium, {} low, {} info, {} acknowledged",
            counts.high, counts.medium, counts.low, counts.info, counts.acknowledged
        ));
        for finding in &self.validation.warnings {
            lines.push(format!(
                "  [{}] {}: {}",
                finding.severity.as_str().to_uppercase(),
                finding.code.as_str(),
                finding.message
            ));
        }
        lines
    }
}
