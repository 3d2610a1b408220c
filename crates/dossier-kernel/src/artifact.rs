//! Artifact loading and classification.
//!
//! Each declared artifact is read once, as a whole file, and classified as
//! present, missing, corrupt or stub. Nothing downstream of [`ArtifactSet`]
//! touches the filesystem.

use crate::coerce::{as_dict, is_truthy};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::Path;

/// A declared artifact: its logical name and whether the pipeline requires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub name: &'static str,
    pub required: bool,
}

impl ArtifactSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }

    pub fn file_name(&self) -> String {
        file_name(self.name)
    }
}

/// On-disk file name for a logical artifact name.
pub fn file_name(name: &str) -> String {
    format!("{name}.json")
}

/// Classification of one artifact after loading.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactState {
    /// A JSON object that is not a stub.
    Present(Map<String, Value>),
    /// No file at the expected path.
    Missing,
    /// Unreadable, not JSON, or JSON whose top level is not an object.
    Corrupt { detail: String },
    /// An object with a truthy `skipped` member: the step was deliberately
    /// not performed.
    Stub { reason: Option<String> },
}

impl ArtifactState {
    /// Classify raw file contents.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::from_value(value),
            Err(err) => Self::Corrupt {
                detail: err.to_string(),
            },
        }
    }

    /// Classify an already-parsed JSON document.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => {
                if map.get("skipped").is_some_and(is_truthy) {
                    let reason = map
                        .get("reason")
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    Self::Stub { reason }
                } else {
                    Self::Present(map)
                }
            }
            other => Self::Corrupt {
                detail: format!("top-level value is {}, expected object", json_kind(&other)),
            },
        }
    }

    /// Present or stub. Corrupt artifacts are neither found nor missing.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Present(_) | Self::Stub { .. })
    }

    pub fn usable(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Present(map) => Some(map),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Present(_) => "present",
            Self::Missing => "missing",
            Self::Corrupt { .. } => "corrupt",
            Self::Stub { .. } => "stub",
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactEntry {
    pub spec: ArtifactSpec,
    pub state: ArtifactState,
}

/// Classified artifacts in declaration order. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactSet {
    entries: Vec<ArtifactEntry>,
}

impl ArtifactSet {
    /// Read and classify every declared artifact under `dir`.
    pub fn load(dir: &Path, specs: &[ArtifactSpec]) -> Self {
        let entries = specs
            .iter()
            .map(|spec| {
                let state = read_state(&dir.join(spec.file_name()));
                match &state {
                    ArtifactState::Corrupt { detail } => {
                        tracing::debug!(artifact = spec.name, %detail, "artifact is corrupt");
                    }
                    other => {
                        tracing::debug!(artifact = spec.name, state = other.kind(), "classified artifact");
                    }
                }
                ArtifactEntry { spec: *spec, state }
            })
            .collect();
        Self { entries }
    }

    /// Build a set from already-classified states.
    pub fn from_states(states: impl IntoIterator<Item = (ArtifactSpec, ArtifactState)>) -> Self {
        Self {
            entries: states
                .into_iter()
                .map(|(spec, state)| ArtifactEntry { spec, state })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[ArtifactEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state(&self, name: &str) -> Option<&ArtifactState> {
        self.entries
            .iter()
            .find(|entry| entry.spec.name == name)
            .map(|entry| &entry.state)
    }

    /// The object of a present artifact.
    pub fn usable(&self, name: &str) -> Option<&Map<String, Value>> {
        self.state(name).and_then(ArtifactState::usable)
    }

    pub fn is_usable(&self, name: &str) -> bool {
        self.usable(name).is_some()
    }

    /// The object of a present artifact, or an empty object otherwise.
    pub fn dict(&self, name: &str) -> &Map<String, Value> {
        match self.usable(name) {
            Some(map) => map,
            None => as_dict(None),
        }
    }

    /// File names of present and stub artifacts.
    pub fn found(&self) -> Vec<String> {
        self.file_names_where(ArtifactState::is_found)
    }

    /// File names of missing artifacts, required or optional.
    pub fn missing(&self) -> Vec<String> {
        self.file_names_where(|state| matches!(state, ArtifactState::Missing))
    }

    pub fn corrupt(&self) -> Vec<String> {
        self.file_names_where(|state| matches!(state, ArtifactState::Corrupt { .. }))
    }

    fn file_names_where(&self, predicate: impl Fn(&ArtifactState) -> bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.state))
            .map(|entry| entry.spec.file_name())
            .collect()
    }
}

fn read_state(path: &Path) -> ArtifactState {
    match fs::read(path) {
        Ok(bytes) => ArtifactState::from_bytes(&bytes),
        Err(err) if err.kind() == io::ErrorKind::NotFound => ArtifactState::Missing,
        Err(err) => ArtifactState::Corrupt {
            detail: err.to_string(),
        },
    }
}
