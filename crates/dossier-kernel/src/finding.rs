//! Findings, severities and per-pipeline rule codes.
//!
//! Each pipeline declares a closed enum of codes with [`rule_codes!`]. The
//! macro generates the severity and label tables as exhaustive matches, so
//! every code has exactly one base severity and adding a code without one
//! does not compile.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a finding.
///
/// `Acknowledged` is never a base severity; it is what an accepted medium
/// finding becomes after acceptance resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
    Info,
    Acknowledged,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
        Severity::Acknowledged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
            Self::Acknowledged => "acknowledged",
        }
    }

    /// Marker used in the rendered warnings section.
    pub fn icon(self) -> &'static str {
        match self {
            Self::High => "!!!",
            Self::Medium => "!!",
            Self::Low => "i",
            Self::Info | Self::Acknowledged => "~",
        }
    }

    /// High and medium findings fail a strict run.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::High | Self::Medium)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline's closed set of finding codes.
///
/// Implemented by [`rule_codes!`]; the integrity codes are shared by every
/// pipeline so the kernel can emit them generically.
pub trait RuleCode:
    Copy + Eq + Ord + fmt::Debug + fmt::Display + Serialize + Send + Sync + 'static
{
    const ALL: &'static [Self];
    const CORRUPT_ARTIFACT: Self;
    const MISSING_ARTIFACT: Self;

    /// The wire name, e.g. `STAGE_MISMATCH`.
    fn as_str(self) -> &'static str;

    fn severity(self) -> Severity;

    /// Human label used in rendered reports.
    fn label(self) -> &'static str;

    fn parse(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == code)
    }

    /// Only medium codes may be silenced by an acceptance directive.
    fn is_acceptable(self) -> bool {
        self.severity() == Severity::Medium
    }
}

/// Declare a pipeline's code enum together with its severity and label
/// tables. The enum must contain `CorruptArtifact` and `MissingArtifact`.
#[macro_export]
macro_rules! rule_codes {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $variant:ident => ($code:literal, $sev:ident, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis enum $name {
            $( $variant, )+
        }

        impl $crate::finding::RuleCode for $name {
            const ALL: &'static [Self] = &[$( Self::$variant, )+];
            const CORRUPT_ARTIFACT: Self = Self::CorruptArtifact;
            const MISSING_ARTIFACT: Self = Self::MissingArtifact;

            fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $code, )+
                }
            }

            fn severity(self) -> $crate::finding::Severity {
                match self {
                    $( Self::$variant => $crate::finding::Severity::$sev, )+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::finding::RuleCode::as_str(*self))
            }
        }

        impl $crate::__serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::__serde::Serializer,
            {
                serializer.serialize_str($crate::finding::RuleCode::as_str(*self))
            }
        }
    };
}

/// One consistency observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding<C> {
    pub code: C,
    pub message: String,
    pub severity: Severity,
}

impl<C: RuleCode> Finding<C> {
    /// A finding at the code's base severity.
    pub fn new(code: C, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity: code.severity(),
        }
    }
}

/// Per-severity tallies of a finding list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub acknowledged: usize,
}

impl SeverityCounts {
    pub fn of<C>(findings: &[Finding<C>]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Info => counts.info += 1,
                Severity::Acknowledged => counts.acknowledged += 1,
            }
        }
        counts
    }

    pub fn blocking(&self) -> usize {
        self.high + self.medium
    }
}
