//! Binary logistic regression over encoded startup features.

use serde::{Deserialize, Serialize};

use super::sigmoid;

mod train;
pub use train::{TrainOptions, train_logreg};

/// Fitted logistic regression parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    pub model_version: i64,
    pub feature_len: usize,
    pub weights: Vec<f32>,
    pub bias: f32,
}

impl LogRegModel {
    /// Validate dimensions and parameter sanity.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_len == 0 {
            return Err("feature_len must be > 0".to_string());
        }
        if self.weights.len() != self.feature_len {
            return Err(format!(
                "weights length {} does not match feature_len {}",
                self.weights.len(),
                self.feature_len
            ));
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err("logistic regression parameters must be finite".to_string());
        }
        Ok(())
    }

    /// Raw log-odds for a feature vector.
    pub fn decision(&self, features: &[f32]) -> f32 {
        self.weights
            .iter()
            .zip(features)
            .fold(self.bias, |acc, (w, x)| acc + w * x)
    }

    /// Probability of success; NaN when the vector has the wrong width.
    pub fn predict_probability(&self, features: &[f32]) -> f32 {
        if features.len() != self.feature_len {
            return f32::NAN;
        }
        sigmoid(self.decision(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_model_predicts_one_half() {
        let model = LogRegModel {
            model_version: 1,
            feature_len: 3,
            weights: vec![0.0; 3],
            bias: 0.0,
        };
        model.validate().unwrap();
        assert_eq!(model.predict_probability(&[1.0, -2.0, 3.0]), 0.5);
    }

    #[test]
    fn wrong_width_is_not_a_probability() {
        let model = LogRegModel {
            model_version: 1,
            feature_len: 2,
            weights: vec![1.0, 1.0],
            bias: 0.0,
        };
        assert!(model.predict_probability(&[1.0]).is_nan());
    }

    #[test]
    fn non_finite_weights_fail_validation() {
        let model = LogRegModel {
            model_version: 1,
            feature_len: 1,
            weights: vec![f32::NAN],
            bias: 0.0,
        };
        assert!(model.validate().is_err());
    }
}
