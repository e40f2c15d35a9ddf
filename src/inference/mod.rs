//! Single-record prediction against the loaded artifact.
//!
//! Stateless: every call reads the shared artifact and nothing else, so the
//! same input against the same artifact always yields the same probability.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::encoder::SchemaMismatchError;
use crate::model_store::ModelArtifact;
use crate::schema::{self, FeatureRecord, ValidationError};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatchError),
    #[error("Classifier produced an invalid probability: {value}")]
    ModelOutput { value: f32 },
}

/// Response body returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub success_probability: f32,
}

/// Probability plus diagnostics that stay server-side.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub success_probability: f32,
    /// Categorical fields that were not in the training vocabulary.
    pub unseen_fields: Vec<&'static str>,
}

impl Prediction {
    pub fn result(&self) -> PredictionResult {
        PredictionResult {
            success_probability: self.success_probability,
        }
    }
}

/// Validate a raw JSON body and predict.
pub fn predict_value(artifact: &ModelArtifact, body: &Value) -> Result<Prediction, PredictError> {
    let record = schema::validate_value(body)?;
    predict_record(artifact, &record)
}

/// Predict for a record that already passed validation.
pub fn predict_record(
    artifact: &ModelArtifact,
    record: &FeatureRecord,
) -> Result<Prediction, PredictError> {
    let vector = artifact
        .encoder
        .transform_checked(record, &artifact.layout)
        .inspect_err(|err| error!(model_id = %artifact.model_id, "{err}"))?;
    let unseen_fields = artifact.encoder.unseen_fields(record);
    if !unseen_fields.is_empty() {
        info!(
            fields = ?unseen_fields,
            industry = %record.industry,
            country = %record.country,
            "Unseen category mapped to reserved index"
        );
    }
    let probability = artifact.classifier.predict_probability(vector.as_slice());
    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        error!(
            model_id = %artifact.model_id,
            value = probability,
            "Classifier output outside [0, 1]"
        );
        return Err(PredictError::ModelOutput { value: probability });
    }
    debug!(
        founded_year = record.founded_year,
        funding_usd = record.funding_usd,
        probability,
        "Prediction"
    );
    Ok(Prediction {
        success_probability: probability,
        unseen_fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::LabeledRecord;
    use crate::ml::Classifier;
    use crate::trainer::{TrainerOptions, train_artifact};
    use serde_json::json;

    fn artifact() -> ModelArtifact {
        let rows: Vec<LabeledRecord> = (0..40)
            .map(|i| LabeledRecord {
                line: i + 2,
                record: FeatureRecord {
                    founded_year: 2005 + i as i32 % 15,
                    funding_usd: 100_000.0 * (i + 1) as f64,
                    industry: if i % 3 == 0 { "IT" } else { "Healthcare" }.to_string(),
                    country: if i % 2 == 0 { "USA" } else { "India" }.to_string(),
                },
                succeeded: i % 3 == 0,
            })
            .collect();
        train_artifact(&rows, &TrainerOptions::default(), "test")
            .unwrap()
            .artifact
    }

    #[test]
    fn valid_body_yields_probability_in_range() {
        let artifact = artifact();
        let body = json!({"founded_year": 2015, "funding_usd": 1000000, "industry": "IT", "country": "USA"});
        let prediction = predict_value(&artifact, &body).unwrap();
        assert!((0.0..=1.0).contains(&prediction.success_probability));
        assert!(prediction.unseen_fields.is_empty());
        assert_eq!(predict_value(&artifact, &body).unwrap(), prediction);
    }

    #[test]
    fn unseen_category_degrades_gracefully() {
        let artifact = artifact();
        let body = json!({"founded_year": 2015, "funding_usd": 1000000, "industry": "Fintech", "country": "Brazil"});
        let prediction = predict_value(&artifact, &body).unwrap();
        assert!((0.0..=1.0).contains(&prediction.success_probability));
        assert_eq!(prediction.unseen_fields, vec!["industry", "country"]);
    }

    #[test]
    fn missing_field_is_a_validation_error() {
        let artifact = artifact();
        let body = json!({"founded_year": 2015, "funding_usd": 1000000, "industry": "IT"});
        match predict_value(&artifact, &body) {
            Err(PredictError::Validation(err)) => assert_eq!(err.fields(), vec!["country"]),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn foreign_layout_is_a_schema_mismatch() {
        let mut artifact = artifact();
        artifact.layout.columns.push("extra".to_string());
        artifact.layout.fingerprint = "0".repeat(64);
        let body = json!({"founded_year": 2015, "funding_usd": 10, "industry": "IT", "country": "USA"});
        assert!(matches!(
            predict_value(&artifact, &body),
            Err(PredictError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn corrupted_parameters_surface_as_model_output_error() {
        let mut artifact = artifact();
        if let Classifier::Logreg(model) = &mut artifact.classifier {
            model.bias = f32::NAN;
        }
        let body = json!({"founded_year": 2015, "funding_usd": 10, "industry": "IT", "country": "USA"});
        assert!(matches!(
            predict_value(&artifact, &body),
            Err(PredictError::ModelOutput { .. })
        ));
    }
}
