//! Provenance classification of sizing figures.
//!
//! Each figure's quantitative inputs are matched against the assumptions
//! recorded in `validation.json`; the categories found there decide how
//! much confidence the figure deserves. Deck claims from `inputs.json` are
//! compared against the calculated value on the way.

use super::{APPROACHES, FIGURES, INPUTS, SIZING, VALIDATION, is_quantitative};
use dossier_kernel::ArtifactSet;
use dossier_kernel::coerce::{as_dict, as_numeric_lenient, non_empty_str, number_or, objects};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const SOURCED: &str = "sourced";
const DERIVED: &str = "derived";
const AGENT_ESTIMATE: &str = "agent_estimate";

/// Deck deltas beyond this magnitude (percent) are reported.
pub const DECK_DELTA_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Unknown,
    AgentEstimate,
    Sourced,
    Derived,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::AgentEstimate => AGENT_ESTIMATE,
            Self::Sourced => SOURCED,
            Self::Derived => DERIVED,
        }
    }

    fn of<'a>(categories: impl IntoIterator<Item = &'a String>) -> Self {
        let mut resolved = false;
        let mut all_sourced = true;
        for category in categories {
            if category == AGENT_ESTIMATE {
                return Self::AgentEstimate;
            }
            resolved = true;
            all_sourced &= category == SOURCED;
        }
        match (resolved, all_sourced) {
            (false, _) => Self::Unknown,
            (true, true) => Self::Sourced,
            (true, false) => Self::Derived,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfidenceBreakdown {
    pub sourced: usize,
    pub derived: usize,
    pub agent_estimate: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureProvenance {
    pub classification: Classification,
    pub confidence_breakdown: ConfidenceBreakdown,
    /// The claim exactly as the deck states it.
    pub deck_claim: Option<Value>,
    pub delta_vs_deck_pct: Option<f64>,
    pub input_provenances: BTreeMap<String, String>,
    #[serde(skip)]
    pub calculated: f64,
}

impl FigureProvenance {
    /// Numeric deck claim and delta, when the delta is large enough to
    /// report.
    pub fn deck_mismatch(&self) -> Option<(f64, f64)> {
        let delta = self.delta_vs_deck_pct?;
        let claim = as_numeric_lenient(self.deck_claim.as_ref())?;
        (delta.abs() > DECK_DELTA_THRESHOLD).then_some((claim, delta))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApproachProvenance {
    pub tam: FigureProvenance,
    pub sam: FigureProvenance,
    pub som: FigureProvenance,
}

impl ApproachProvenance {
    pub fn figures(&self) -> [(&'static str, &FigureProvenance); 3] {
        [("tam", &self.tam), ("sam", &self.sam), ("som", &self.som)]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Provenance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_down: Option<ApproachProvenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom_up: Option<ApproachProvenance>,
    /// Quantitative inputs with no matching assumption, in discovery order.
    #[serde(skip)]
    pub unresolved: Vec<Unresolved>,
}

/// A quantitative input no assumption accounts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub param: String,
    /// Upper-case figure name, e.g. `SAM`.
    pub figure: String,
}

impl Provenance {
    pub fn approach(&self, name: &str) -> Option<&ApproachProvenance> {
        match name {
            "top_down" => self.top_down.as_ref(),
            "bottom_up" => self.bottom_up.as_ref(),
            _ => None,
        }
    }

    /// Present approaches in report order.
    pub fn approaches(&self) -> impl Iterator<Item = (&'static str, &ApproachProvenance)> {
        APPROACHES
            .into_iter()
            .filter_map(|name| self.approach(name).map(|approach| (name, approach)))
    }

    pub fn is_empty(&self) -> bool {
        self.top_down.is_none() && self.bottom_up.is_none()
    }

    /// Classify every figure in `sizing`. `validation` supplies assumption
    /// categories and `inputs` the deck claims; either may be absent.
    pub fn compute(
        sizing: &Map<String, Value>,
        validation: Option<&Map<String, Value>>,
        inputs: Option<&Map<String, Value>>,
    ) -> Self {
        let assumptions = assumption_categories(validation);
        let claims = inputs.map(|inputs| as_dict(inputs.get("existing_claims")));

        let mut provenance = Provenance::default();
        for approach in APPROACHES {
            let Some(data) = sizing.get(approach).and_then(Value::as_object) else {
                continue;
            };
            let [tam, sam, som] = FIGURES.map(|figure| {
                classify_figure(
                    figure,
                    as_dict(data.get(figure)),
                    &assumptions,
                    claims.and_then(|claims| claims.get(figure)),
                    &mut provenance.unresolved,
                )
            });
            let computed = Some(ApproachProvenance { tam, sam, som });
            match approach {
                "top_down" => provenance.top_down = computed,
                _ => provenance.bottom_up = computed,
            }
        }
        provenance
    }

    /// Unresolved parameters grouped by name, each with the figures that
    /// use it.
    pub fn unresolved_by_param(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for entry in &self.unresolved {
            grouped
                .entry(entry.param.as_str())
                .or_default()
                .push(entry.figure.as_str());
        }
        grouped
    }
}

/// Assumption name to category. Entries missing either are ignored; later
/// entries override earlier ones.
fn assumption_categories(validation: Option<&Map<String, Value>>) -> BTreeMap<String, String> {
    let Some(validation) = validation else {
        return BTreeMap::new();
    };
    objects(validation.get("assumptions"))
        .filter_map(|assumption| {
            let name = non_empty_str(assumption.get("name"))?;
            let category = non_empty_str(assumption.get("category"))?;
            Some((name.to_string(), category.to_string()))
        })
        .collect()
}

/// Signed percent difference of `calculated` from a positive numeric claim,
/// rounded to one decimal.
pub fn deck_delta(calculated: f64, claim: Option<&Value>) -> Option<f64> {
    let claim = as_numeric_lenient(claim).filter(|claim| *claim > 0.0)?;
    Some(((calculated - claim) / claim * 100.0 * 10.0).round() / 10.0)
}

fn classify_figure(
    figure: &str,
    data: &Map<String, Value>,
    assumptions: &BTreeMap<String, String>,
    claim: Option<&Value>,
    unresolved: &mut Vec<Unresolved>,
) -> FigureProvenance {
    let mut input_provenances = BTreeMap::new();
    for param in as_dict(data.get("inputs")).keys() {
        if !is_quantitative(param) {
            continue;
        }
        match assumptions.get(param) {
            Some(category) => {
                input_provenances.insert(param.clone(), category.clone());
            }
            None => unresolved.push(Unresolved {
                param: param.clone(),
                figure: figure.to_uppercase(),
            }),
        }
    }

    let mut breakdown = ConfidenceBreakdown::default();
    for category in input_provenances.values() {
        match category.as_str() {
            SOURCED => breakdown.sourced += 1,
            DERIVED => breakdown.derived += 1,
            AGENT_ESTIMATE => breakdown.agent_estimate += 1,
            _ => {}
        }
    }

    let calculated = number_or(data.get("value"), 0.0);
    let deck_claim = claim.filter(|claim| !claim.is_null()).cloned();
    FigureProvenance {
        classification: Classification::of(input_provenances.values()),
        confidence_breakdown: breakdown,
        delta_vs_deck_pct: deck_delta(calculated, deck_claim.as_ref()),
        deck_claim,
        input_provenances,
        calculated,
    }
}

/// Provenance of the loaded artifacts, or `None` when sizing is unusable.
pub fn of_artifacts(artifacts: &ArtifactSet) -> Option<Provenance> {
    let sizing = artifacts.usable(SIZING)?;
    Some(Provenance::compute(
        sizing,
        artifacts.usable(VALIDATION),
        artifacts.usable(INPUTS),
    ))
}

/// The `provenance` block attached to the composition output.
pub(super) fn supplement(artifacts: &ArtifactSet) -> Option<Value> {
    let provenance = of_artifacts(artifacts).filter(|provenance| !provenance.is_empty())?;
    match serde_json::to_value(&provenance) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize provenance");
            None
        }
    }
}
