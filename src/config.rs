//! Service and training configuration.
//!
//! Settings come from `config.toml` in the app root (or an explicit file),
//! then environment overrides, then command-line flags applied by the
//! binaries. A missing default file means defaults.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};
use crate::ml::{ClassifierKind, gbdt_stump, logreg};
use crate::trainer::TrainerOptions;

pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Default artifact file name inside the models directory.
pub const DEFAULT_ARTIFACT_NAME: &str = "startup_success_model.json";
pub const BIND_ENV_VAR: &str = "STARTUP_ODDS_BIND";
pub const MODEL_ENV_VAR: &str = "STARTUP_ODDS_MODEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    AppDir(#[from] AppDirError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    /// Request bodies larger than this are rejected.
    pub max_body_bytes: usize,
    /// Browser origins allowed by CORS; `"*"` allows any.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            max_body_bytes: 16 * 1024,
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.trim().parse().map_err(|err| ConfigError::Invalid {
            key: "server.bind",
            message: format!("'{}': {err}", self.bind),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Defaults to `<app root>/models/startup_success_model.json`.
    pub artifact_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub classifier: ClassifierKind,
    pub validation_fraction: f64,
    pub seed: u64,
    pub epochs: usize,
    /// Logistic regression SGD step.
    pub learning_rate: f32,
    /// Logistic regression L2 penalty.
    pub l2: f32,
    pub batch_size: usize,
    pub balance_classes: bool,
    pub rounds: usize,
    /// Boosting shrinkage per round.
    pub gbdt_learning_rate: f32,
    /// Boosting L2 penalty on leaf values.
    pub gbdt_l2: f32,
    pub bins: usize,
    pub max_logged_skips: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        let logreg = logreg::TrainOptions::default();
        let gbdt = gbdt_stump::TrainOptions::default();
        let trainer = TrainerOptions::default();
        Self {
            classifier: trainer.classifier,
            validation_fraction: trainer.validation_fraction,
            seed: trainer.seed,
            epochs: logreg.epochs,
            learning_rate: logreg.learning_rate,
            l2: logreg.l2,
            batch_size: logreg.batch_size,
            balance_classes: logreg.balance_classes,
            rounds: gbdt.rounds,
            gbdt_learning_rate: gbdt.learning_rate,
            gbdt_l2: gbdt.l2,
            bins: gbdt.bins,
            max_logged_skips: trainer.max_logged_skips,
        }
    }
}

impl TrainingSettings {
    pub fn trainer_options(&self) -> TrainerOptions {
        TrainerOptions {
            classifier: self.classifier,
            logreg: logreg::TrainOptions {
                epochs: self.epochs,
                learning_rate: self.learning_rate,
                l2: self.l2,
                batch_size: self.batch_size,
                seed: self.seed,
                balance_classes: self.balance_classes,
            },
            gbdt: gbdt_stump::TrainOptions {
                rounds: self.rounds,
                learning_rate: self.gbdt_learning_rate,
                bins: self.bins,
                l2: self.gbdt_l2,
            },
            validation_fraction: self.validation_fraction,
            seed: self.seed,
            max_logged_skips: self.max_logged_skips,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerSettings,
    pub model: ModelSettings,
    pub training: TrainingSettings,
}

impl ServiceConfig {
    /// Load from `explicit` (which must exist) or the default location, then
    /// apply environment overrides. Not validated: callers apply their own
    /// overrides first and call [`ServiceConfig::validate`] once.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let path = config_path()?;
                if path.exists() {
                    Self::load_from_path(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `STARTUP_ODDS_BIND` / `STARTUP_ODDS_MODEL` from `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(bind) = lookup(BIND_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.server.bind = bind;
        }
        if let Some(model) = lookup(MODEL_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.model.artifact_path = Some(PathBuf::from(model));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_addr()?;
        if self.server.max_body_bytes == 0 {
            return Err(invalid("server.max_body_bytes", "must be > 0"));
        }
        let training = &self.training;
        if !(0.0..=0.9).contains(&training.validation_fraction) {
            return Err(invalid(
                "training.validation_fraction",
                format!("{} is outside [0, 0.9]", training.validation_fraction),
            ));
        }
        if training.epochs == 0 {
            return Err(invalid("training.epochs", "must be > 0"));
        }
        if training.rounds == 0 {
            return Err(invalid("training.rounds", "must be > 0"));
        }
        if training.batch_size == 0 {
            return Err(invalid("training.batch_size", "must be > 0"));
        }
        if !training.learning_rate.is_finite() || training.learning_rate <= 0.0 {
            return Err(invalid("training.learning_rate", "must be finite and > 0"));
        }
        if !training.l2.is_finite() || training.l2 < 0.0 {
            return Err(invalid("training.l2", "must be finite and >= 0"));
        }
        if !training.gbdt_learning_rate.is_finite() || training.gbdt_learning_rate <= 0.0 {
            return Err(invalid("training.gbdt_learning_rate", "must be finite and > 0"));
        }
        if !training.gbdt_l2.is_finite() || training.gbdt_l2 < 0.0 {
            return Err(invalid("training.gbdt_l2", "must be finite and >= 0"));
        }
        if !(2..=256).contains(&training.bins) {
            return Err(invalid("training.bins", "must be within 2..=256"));
        }
        Ok(())
    }

    /// Configured artifact path, or the default inside the models directory.
    pub fn artifact_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.model.artifact_path {
            Some(path) => Ok(path.clone()),
            None => Ok(app_dirs::models_dir()?.join(DEFAULT_ARTIFACT_NAME)),
        }
    }
}

/// Default config file location inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}
