//! Binary classifiers producing a success probability.
//!
//! Both algorithms are small, dependency-free and fully deterministic given
//! their options, so retraining on identical data reproduces the artifact.

pub mod gbdt_stump;
pub mod logreg;
pub mod metrics;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use gbdt_stump::GbdtStumpModel;
use logreg::LogRegModel;

/// In-memory labeled feature matrix.
#[derive(Debug, Clone, Default)]
pub struct BinaryDataset {
    /// Row-major feature vectors, all of the same width.
    pub x: Vec<Vec<f32>>,
    /// `true` for a successful startup.
    pub y: Vec<bool>,
}

impl BinaryDataset {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.y.iter().filter(|&&label| label).count()
    }

    /// Shared shape checks used by every trainer.
    pub(crate) fn check_shape(&self) -> Result<usize, String> {
        if self.x.is_empty() || self.y.is_empty() {
            return Err("Empty training set".to_string());
        }
        if self.x.len() != self.y.len() {
            return Err("Mismatched training inputs/labels".to_string());
        }
        let dim = self.x[0].len();
        if dim == 0 {
            return Err("Feature vectors are empty".to_string());
        }
        if self.x.iter().any(|row| row.len() != dim) {
            return Err("Inconsistent feature row length".to_string());
        }
        if self.x.iter().flatten().any(|v| !v.is_finite()) {
            return Err("Non-finite feature value in training set".to_string());
        }
        Ok(dim)
    }
}

/// Supported classifier algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    #[default]
    Logreg,
    GbdtStump,
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClassifierKind::Logreg => "logreg",
            ClassifierKind::GbdtStump => "gbdt_stump",
        })
    }
}

impl FromStr for ClassifierKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "logreg" | "logistic" => Ok(ClassifierKind::Logreg),
            "gbdt" | "gbdt_stump" | "gbdt-stump" => Ok(ClassifierKind::GbdtStump),
            other => Err(format!(
                "Unknown classifier '{other}' (expected logreg or gbdt_stump)"
            )),
        }
    }
}

/// Fitted classifier as persisted in the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    Logreg(LogRegModel),
    GbdtStump(GbdtStumpModel),
}

impl Classifier {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            Classifier::Logreg(_) => ClassifierKind::Logreg,
            Classifier::GbdtStump(_) => ClassifierKind::GbdtStump,
        }
    }

    /// Number of inputs the classifier was fitted on.
    pub fn feature_len(&self) -> usize {
        match self {
            Classifier::Logreg(model) => model.feature_len,
            Classifier::GbdtStump(model) => model.feature_len,
        }
    }

    /// Probability of the positive class. Callers check the range.
    pub fn predict_probability(&self, features: &[f32]) -> f32 {
        match self {
            Classifier::Logreg(model) => model.predict_probability(features),
            Classifier::GbdtStump(model) => model.predict_probability(features),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Classifier::Logreg(model) => model.validate(),
            Classifier::GbdtStump(model) => model.validate(),
        }
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f32) -> f32 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Inverse of [`sigmoid`] with the probability clamped away from 0 and 1.
pub fn logit(p: f32) -> f32 {
    let p = p.clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_is_bounded_and_symmetric() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(500.0) <= 1.0);
        assert!(sigmoid(-500.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-6);
        assert!((sigmoid(logit(0.8)) - 0.8).abs() < 1e-5);
    }

    #[test]
    fn classifier_kind_parses_aliases() {
        assert_eq!("logreg".parse::<ClassifierKind>().unwrap(), ClassifierKind::Logreg);
        assert_eq!("GBDT".parse::<ClassifierKind>().unwrap(), ClassifierKind::GbdtStump);
        assert!("forest".parse::<ClassifierKind>().is_err());
    }

    #[test]
    fn shape_check_rejects_ragged_rows() {
        let dataset = BinaryDataset {
            x: vec![vec![0.0, 1.0], vec![1.0]],
            y: vec![true, false],
        };
        assert!(dataset.check_shape().is_err());
    }
}
