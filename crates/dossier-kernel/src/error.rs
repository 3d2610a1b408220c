//! Error types for Dossier operations.
//!
//! Malformed artifacts are never errors: they are classified states (see
//! [`crate::artifact::ArtifactState`]). Errors here are operator-facing
//! failures that stop a run before any output is produced.

use std::path::PathBuf;

/// Errors arising from invalid invocation or I/O on the output side.
#[derive(Debug, thiserror::Error)]
pub enum DossierError {
    /// The input directory does not exist or is not a directory.
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// The output path resolves to a file directly under the filesystem root.
    #[error("output path resolves to root directory: {}", path.display())]
    OutputAtRoot { path: PathBuf },

    /// Reading or writing a path failed.
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The composition could not be serialized.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// A date argument was not `YYYY-MM-DD`.
    #[error("invalid date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },
}

pub type Result<T> = std::result::Result<T, DossierError>;
