//! Top-level key sets used for schema drift detection.

use super::{CONFLICT_CHECK, DISCUSSION, FUND_PROFILE, PRIOR_ARTIFACTS, SCORE_DIMENSIONS, STARTUP_PROFILE};

/// Keys an artifact may carry and keys it must carry.
pub struct KeySchema {
    pub artifact: &'static str,
    pub expected: &'static [&'static str],
    pub required: &'static [&'static str],
}

pub const SCHEMAS: &[KeySchema] = &[
    KeySchema {
        artifact: STARTUP_PROFILE,
        expected: &[
            "company_name",
            "simulation_date",
            "stage",
            "one_liner",
            "sector",
            "geography",
            "business_model",
            "funding_history",
            "current_raise",
            "key_metrics",
            "materials_provided",
            // common agent additions
            "founded",
            "team",
            "website",
            "competitors",
            "product_description",
            "team_highlights",
        ],
        required: &["company_name", "stage", "one_liner", "sector"],
    },
    KeySchema {
        artifact: FUND_PROFILE,
        expected: &[
            "fund_name",
            "mode",
            "thesis_areas",
            "check_size_range",
            "stage_focus",
            "archetypes",
            "portfolio",
            "sources",
            "validation",
            "accepted_warnings",
        ],
        required: &[
            "fund_name",
            "mode",
            "thesis_areas",
            "check_size_range",
            "stage_focus",
            "archetypes",
            "portfolio",
        ],
    },
    KeySchema {
        artifact: CONFLICT_CHECK,
        expected: &["portfolio_size", "conflicts", "summary", "validation"],
        required: &["portfolio_size", "conflicts"],
    },
    KeySchema {
        artifact: DISCUSSION,
        expected: &[
            "assessment_mode",
            "partner_verdicts",
            "debate_sections",
            "consensus_verdict",
            "key_concerns",
            "diligence_requirements",
            "assessment_mode_intentional",
        ],
        required: &["assessment_mode", "partner_verdicts", "consensus_verdict"],
    },
    KeySchema {
        artifact: SCORE_DIMENSIONS,
        expected: &["items", "summary"],
        required: &["items", "summary"],
    },
    KeySchema {
        artifact: PRIOR_ARTIFACTS,
        expected: &["imported", "skipped", "reason"],
        required: &[],
    },
];

impl KeySchema {
    /// Keys present but not expected, sorted.
    pub fn unexpected<'a>(&self, keys: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
        let mut extra: Vec<&str> = keys
            .map(String::as_str)
            .filter(|key| !self.expected.contains(key))
            .collect();
        extra.sort_unstable();
        extra
    }

    /// Required keys absent from `has`, sorted.
    pub fn missing(&self, has: impl Fn(&str) -> bool) -> Vec<&'static str> {
        let mut missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .filter(|key| !has(key))
            .collect();
        missing.sort_unstable();
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_keys_are_expected() {
        for schema in SCHEMAS {
            for key in schema.required {
                assert!(
                    schema.expected.contains(key),
                    "{}: required key {key} not expected",
                    schema.artifact
                );
            }
        }
    }
}
