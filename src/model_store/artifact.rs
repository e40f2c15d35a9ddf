//! The persisted model artifact: encoder, classifier and provenance in one file.

use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};

use super::ArtifactError;
use crate::encoder::{Encoder, FeatureLayout, SCHEMA_VERSION};
use crate::ml::metrics::ValidationMetrics;
use crate::ml::{Classifier, ClassifierKind};

/// Value of the `format` field identifying our artifacts.
pub const ARTIFACT_FORMAT: &str = "startup-odds-model";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: String,
    pub schema_version: String,
    pub model_id: String,
    /// RFC 3339 timestamp of the training run.
    pub trained_at: String,
    /// SHA-256 of the training source bytes.
    pub training_fingerprint: String,
    pub encoder: Encoder,
    pub layout: FeatureLayout,
    pub classifier: Classifier,
    pub metrics: ValidationMetrics,
    pub training_rows: usize,
}

/// Operator-facing description of a loaded artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model_id: String,
    pub schema_version: String,
    pub classifier: ClassifierKind,
    pub trained_at: String,
    pub training_fingerprint: String,
    pub training_rows: usize,
    pub feature_len: usize,
    pub industries: usize,
    pub countries: usize,
    pub metrics: ValidationMetrics,
}

impl ModelArtifact {
    /// Check that this build can serve the artifact.
    pub fn check(&self) -> Result<(), ArtifactError> {
        if self.format != ARTIFACT_FORMAT {
            return Err(ArtifactError::UnsupportedFormat(self.format.clone()));
        }
        check_version(&self.schema_version)?;
        if self.layout.schema_version != self.schema_version {
            return Err(ArtifactError::Invalid(format!(
                "layout schema {} differs from artifact schema {}",
                self.layout.schema_version, self.schema_version
            )));
        }
        self.encoder.validate().map_err(ArtifactError::Invalid)?;
        self.encoder
            .ensure_layout(&self.layout)
            .map_err(|err| ArtifactError::Invalid(err.to_string()))?;
        self.classifier.validate().map_err(ArtifactError::Invalid)?;
        if self.classifier.feature_len() != self.layout.width() {
            return Err(ArtifactError::Invalid(format!(
                "classifier expects {} inputs but layout has {} columns",
                self.classifier.feature_len(),
                self.layout.width()
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            model_id: self.model_id.clone(),
            schema_version: self.schema_version.clone(),
            classifier: self.classifier.kind(),
            trained_at: self.trained_at.clone(),
            training_fingerprint: self.training_fingerprint.clone(),
            training_rows: self.training_rows,
            feature_len: self.layout.width(),
            industries: self.encoder.industry.len(),
            countries: self.encoder.country.len(),
            metrics: self.metrics.clone(),
        }
    }

    /// Read and check an artifact from disk.
    pub fn read(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArtifactError::Missing(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ArtifactError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let artifact: ModelArtifact =
            serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        artifact.check()?;
        Ok(artifact)
    }

    /// Write atomically: serialize into a temp file beside `path`, then rename.
    pub fn write(&self, path: &Path) -> Result<(), ArtifactError> {
        let bytes = serde_json::to_vec_pretty(self).map_err(ArtifactError::Serialize)?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        let write_err = |source: std::io::Error| ArtifactError::Write {
            path: path.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;
        let mut temp = tempfile::Builder::new()
            .prefix(".startup-odds-model")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(write_err)?;
        std::io::Write::write_all(temp.as_file_mut(), &bytes).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(path).map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

/// Accept artifacts written by this major version and not newer than this build.
pub fn check_version(tag: &str) -> Result<(), ArtifactError> {
    let unsupported = || ArtifactError::UnsupportedVersion {
        found: tag.to_string(),
        supported: SCHEMA_VERSION.to_string(),
    };
    let found = Version::parse(tag).map_err(|_| unsupported())?;
    let current = Version::parse(SCHEMA_VERSION).map_err(|_| unsupported())?;
    if found.major != current.major || found > current {
        return Err(unsupported());
    }
    Ok(())
}
