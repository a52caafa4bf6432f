//! Artifacts Module - versioned model bundles on disk
//!
//! Resolution (which version to serve) is kept apart from loading (turning
//! the files into an in-memory bundle).

pub mod bundle;
pub mod resolver;

use std::path::PathBuf;

use thiserror::Error;

pub use bundle::{ArtifactBundle, HistorySummary};
pub use resolver::{resolve_latest, ArtifactVersion, ModelFormat};

/// Boxed error from a deserializer or runtime
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Startup failures. Any of these stops the process before it serves.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact root not found: {}", root.display())]
    NotFound { root: PathBuf },

    #[error("no model_v* versions found under {}", root.display())]
    NoVersions { root: PathBuf },

    #[error("artifact version {version} is incomplete, missing: {}", missing.join(", "))]
    Incomplete { version: String, missing: Vec<String> },

    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub fn load(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        ArtifactError::Load {
            path: path.into(),
            source: source.into(),
        }
    }
}
