//! Dossier kernel: artifact classification, rule evaluation, acceptance
//! resolution and report composition.
//!
//! Data flows one way: the artifact store classifies input documents, the
//! rule registry turns them into findings, acceptance directives downgrade
//! known findings, and the composer renders sections and the validation
//! result. Pipelines plug in their own codes, rules and sections; nothing
//! here knows about decks, committees or markets.

pub mod acceptance;
pub mod artifact;
pub mod coerce;
pub mod compose;
pub mod error;
pub mod finding;
pub mod markdown;
pub mod registry;

pub use acceptance::{AcceptanceDirective, DirectiveRejection, ParsedDirectives, parse_directives, resolve};
pub use artifact::{ArtifactEntry, ArtifactSet, ArtifactSpec, ArtifactState};
pub use compose::{
    ComposeOptions, Composition, Pipeline, PipelineDescriptor, Section, SectionContext,
    ValidationResult, ValidationStatus,
};
pub use error::{DossierError, Result};
pub use finding::{Finding, RuleCode, Severity, SeverityCounts};
pub use registry::{Rule, RuleContext, RuleRegistry, check_integrity};

#[doc(hidden)]
pub use serde as __serde;
