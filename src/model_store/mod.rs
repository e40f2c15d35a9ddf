//! Owns the single model artifact a serving process uses.
//!
//! The artifact is loaded once and shared read-only behind an `Arc`; there is
//! no reload path, so request handlers never need a lock.

mod artifact;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

pub use artifact::{ARTIFACT_FORMAT, ModelArtifact, ModelSummary, check_version};

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Model artifact not found at {0}")]
    Missing(PathBuf),
    #[error("Failed to read model artifact {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse model artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unrecognized model artifact format '{0}'")]
    UnsupportedFormat(String),
    #[error("Unsupported model schema version {found} (this build reads {supported})")]
    UnsupportedVersion { found: String, supported: String },
    #[error("Inconsistent model artifact: {0}")]
    Invalid(String),
    #[error("Failed to serialize model artifact: {0}")]
    Serialize(serde_json::Error),
    #[error("Failed to write model artifact {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Load-once holder for the active artifact.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
    artifact: Arc<ModelArtifact>,
}

impl ModelStore {
    /// Read and check the artifact at `path`; the process cannot serve without it.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let artifact = ModelArtifact::read(path)?;
        info!(
            path = %path.display(),
            model_id = %artifact.model_id,
            schema_version = %artifact.schema_version,
            classifier = %artifact.classifier.kind(),
            features = artifact.layout.width(),
            "Loaded model artifact"
        );
        Ok(Self::from_artifact(path.to_path_buf(), artifact))
    }

    /// Wrap an artifact that is already in memory (tests, benches).
    pub fn from_artifact(path: PathBuf, artifact: ModelArtifact) -> Self {
        Self {
            path,
            artifact: Arc::new(artifact),
        }
    }

    pub fn current(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Shared handle for request handlers.
    pub fn handle(&self) -> Arc<ModelArtifact> {
        Arc::clone(&self.artifact)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
