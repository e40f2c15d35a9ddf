use serde::{Deserialize, Serialize};

use crate::ml::sigmoid;

/// Single-split decision tree used as a weak learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    /// Feature index used for the split.
    pub feature_index: u16,
    /// Threshold in encoded feature units.
    pub threshold: f32,
    /// Score contribution for `feature <= threshold`.
    pub left_value: f32,
    /// Score contribution for `feature > threshold`.
    pub right_value: f32,
}

impl Stump {
    pub fn predict(&self, features: &[f32]) -> f32 {
        let value = features
            .get(self.feature_index as usize)
            .copied()
            .unwrap_or(0.0);
        if value <= self.threshold {
            self.left_value
        } else {
            self.right_value
        }
    }
}

/// Boosted stump ensemble producing log-odds of success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtStumpModel {
    pub model_version: i64,
    pub feature_len: usize,
    /// Shrinkage applied to every stump.
    pub learning_rate: f32,
    /// Starting log-odds (training prior).
    pub init_raw: f32,
    pub stumps: Vec<Stump>,
}

impl GbdtStumpModel {
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_len == 0 {
            return Err("feature_len must be > 0".to_string());
        }
        if !self.init_raw.is_finite() || !self.learning_rate.is_finite() {
            return Err("Boosting parameters must be finite".to_string());
        }
        for (round, stump) in self.stumps.iter().enumerate() {
            if stump.feature_index as usize >= self.feature_len {
                return Err(format!(
                    "Round {round} splits on feature {} but feature_len is {}",
                    stump.feature_index, self.feature_len
                ));
            }
            if !stump.threshold.is_finite()
                || !stump.left_value.is_finite()
                || !stump.right_value.is_finite()
            {
                return Err(format!("Round {round} has non-finite parameters"));
            }
        }
        Ok(())
    }

    /// Raw log-odds for a feature vector.
    pub fn predict_raw(&self, features: &[f32]) -> f32 {
        self.stumps.iter().fold(self.init_raw, |raw, stump| {
            raw + self.learning_rate * stump.predict(features)
        })
    }

    /// Probability of success; NaN when the vector has the wrong width.
    pub fn predict_probability(&self, features: &[f32]) -> f32 {
        if features.len() != self.feature_len {
            return f32::NAN;
        }
        sigmoid(self.predict_raw(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stump_predict_branches() {
        let stump = Stump {
            feature_index: 0,
            threshold: 0.5,
            left_value: -1.0,
            right_value: 2.0,
        };
        assert_eq!(stump.predict(&[0.0]), -1.0);
        assert_eq!(stump.predict(&[0.5]), -1.0);
        assert_eq!(stump.predict(&[0.6]), 2.0);
    }

    #[test]
    fn ensemble_sums_shrunken_stumps() {
        let model = GbdtStumpModel {
            model_version: 1,
            feature_len: 2,
            learning_rate: 0.5,
            init_raw: 0.0,
            stumps: vec![
                Stump {
                    feature_index: 1,
                    threshold: 0.0,
                    left_value: -2.0,
                    right_value: 2.0,
                },
                Stump {
                    feature_index: 1,
                    threshold: 0.0,
                    left_value: -2.0,
                    right_value: 2.0,
                },
            ],
        };
        model.validate().unwrap();
        assert_eq!(model.predict_raw(&[0.0, 1.0]), 2.0);
        assert!(model.predict_probability(&[0.0, 1.0]) > 0.8);
        assert!(model.predict_probability(&[0.0, -1.0]) < 0.2);
        assert!(model.predict_probability(&[0.0]).is_nan());
    }

    #[test]
    fn out_of_range_split_fails_validation() {
        let model = GbdtStumpModel {
            model_version: 1,
            feature_len: 1,
            learning_rate: 0.1,
            init_raw: 0.0,
            stumps: vec![Stump {
                feature_index: 3,
                threshold: 0.0,
                left_value: 0.0,
                right_value: 0.0,
            }],
        };
        assert!(model.validate().is_err());
    }
}
