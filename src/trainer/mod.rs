//! Offline training run: load, validate, fit, evaluate, write the artifact.
//!
//! Any failure before the final write returns early, so the artifact already
//! at the destination stays untouched and servable.

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dataset::split::validation_split;
use crate::dataset::{self, DataLoadError, LabeledRecord, RawTable, SkippedRow};
use crate::encoder::{Encoder, SCHEMA_VERSION};
use crate::ml::metrics::{self, ValidationMetrics};
use crate::ml::{BinaryDataset, Classifier, ClassifierKind, gbdt_stump, logreg};
use crate::model_store::{ARTIFACT_FORMAT, ArtifactError, ModelArtifact};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    DataLoad(#[from] DataLoadError),
    #[error("Training failed: {0}")]
    Fit(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[derive(Debug, Clone)]
pub struct TrainerOptions {
    pub classifier: ClassifierKind,
    pub logreg: logreg::TrainOptions,
    pub gbdt: gbdt_stump::TrainOptions,
    /// Share of rows held out for metrics.
    pub validation_fraction: f64,
    /// Seeds both the split and SGD shuffling.
    pub seed: u64,
    /// Skipped rows logged individually before switching to a count.
    pub max_logged_skips: usize,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            classifier: ClassifierKind::default(),
            logreg: logreg::TrainOptions::default(),
            gbdt: gbdt_stump::TrainOptions::default(),
            validation_fraction: 0.2,
            seed: 42,
            max_logged_skips: 20,
        }
    }
}

/// Fitted artifact plus split sizes, before anything touches disk.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub artifact: ModelArtifact,
    pub train_rows: usize,
    pub validation_rows: usize,
}

/// What a training run did, for the CLI and logs.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub artifact_path: PathBuf,
    pub model_id: String,
    pub classifier: ClassifierKind,
    pub fingerprint: String,
    pub rows_read: usize,
    pub rows_used: usize,
    pub skipped: Vec<SkippedRow>,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub metrics: ValidationMetrics,
}

impl TrainReport {
    pub fn rows_skipped(&self) -> usize {
        self.skipped.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Trainer {
    options: TrainerOptions,
}

impl Trainer {
    pub fn new(options: TrainerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TrainerOptions {
        &self.options
    }

    /// Train from `source` and atomically replace the artifact at `artifact_path`.
    pub fn run(&self, source: &Path, artifact_path: &Path) -> Result<TrainReport, TrainError> {
        info!(source = %source.display(), classifier = %self.options.classifier, "Loading training data");
        let table = dataset::load_table(source)?;
        let (trained, mut report) = self.train_table(&table)?;
        trained.artifact.write(artifact_path)?;
        report.artifact_path = artifact_path.to_path_buf();
        info!(
            path = %artifact_path.display(),
            model_id = %report.model_id,
            "Wrote model artifact"
        );
        Ok(report)
    }

    /// Validate and fit an already-parsed table without writing anything.
    pub fn train_table(&self, table: &RawTable) -> Result<(TrainedModel, TrainReport), TrainError> {
        let validated = dataset::validate_rows(&table.rows);
        for skip in validated.skipped.iter().take(self.options.max_logged_skips) {
            warn!(line = skip.line, reason = %skip.reason, "Skipping training row");
        }
        if validated.skipped.len() > self.options.max_logged_skips {
            warn!(
                more = validated.skipped.len() - self.options.max_logged_skips,
                "Further skipped rows not logged individually"
            );
        }
        info!(
            rows_read = table.rows.len(),
            rows_used = validated.rows.len(),
            rows_skipped = validated.skipped.len(),
            "Validated training rows"
        );
        if validated.rows.is_empty() {
            return Err(DataLoadError::NoUsableRows {
                skipped: validated.skipped.len(),
            }
            .into());
        }

        let trained = train_artifact(&validated.rows, &self.options, &table.fingerprint)?;
        let report = TrainReport {
            artifact_path: PathBuf::new(),
            model_id: trained.artifact.model_id.clone(),
            classifier: trained.artifact.classifier.kind(),
            fingerprint: table.fingerprint.clone(),
            rows_read: table.rows.len(),
            rows_used: validated.rows.len(),
            skipped: validated.skipped,
            train_rows: trained.train_rows,
            validation_rows: trained.validation_rows,
            metrics: trained.artifact.metrics.clone(),
        };
        Ok((trained, report))
    }
}

/// Fit encoder and classifier on validated rows and assemble the artifact.
pub fn train_artifact(
    rows: &[LabeledRecord],
    options: &TrainerOptions,
    fingerprint: &str,
) -> Result<TrainedModel, TrainError> {
    if rows.is_empty() {
        return Err(DataLoadError::NoUsableRows { skipped: 0 }.into());
    }
    let records: Vec<_> = rows.iter().map(|row| row.record.clone()).collect();
    let encoder = Encoder::fit(&records).map_err(TrainError::Fit)?;
    let layout = encoder.layout();

    let positives = rows.iter().filter(|row| row.succeeded).count();
    if positives == 0 || positives == rows.len() {
        warn!(
            rows = rows.len(),
            positives, "Training labels contain a single outcome; probabilities will be degenerate"
        );
    }

    let split = validation_split(rows.len(), options.validation_fraction, options.seed);
    let encode = |indices: &[usize]| BinaryDataset {
        x: indices
            .iter()
            .map(|&idx| encoder.transform(&rows[idx].record).0)
            .collect(),
        y: indices.iter().map(|&idx| rows[idx].succeeded).collect(),
    };
    let train_set = encode(&split.train);
    let validation_set = encode(&split.validation);

    let classifier = fit_classifier(&train_set, options)?;
    let metrics = if validation_set.is_empty() {
        ValidationMetrics::empty()
    } else {
        metrics::evaluate(&classifier, &validation_set)
    };
    match metrics.roc_auc {
        Some(auc) => info!(
            auc,
            accuracy = metrics.accuracy.unwrap_or(0.0),
            log_loss = metrics.log_loss.unwrap_or(0.0),
            validation_rows = metrics.rows,
            "Validation metrics"
        ),
        None => warn!(
            validation_rows = metrics.rows,
            "ROC AUC unavailable: validation split lacks both outcomes"
        ),
    }

    let trained_at = now_rfc3339();
    let artifact = ModelArtifact {
        format: ARTIFACT_FORMAT.to_string(),
        schema_version: SCHEMA_VERSION.to_string(),
        model_id: Uuid::new_v4().to_string(),
        trained_at,
        training_fingerprint: fingerprint.to_string(),
        encoder,
        layout,
        classifier,
        metrics,
        training_rows: rows.len(),
    };
    artifact.check()?;
    Ok(TrainedModel {
        artifact,
        train_rows: train_set.len(),
        validation_rows: validation_set.len(),
    })
}

fn fit_classifier(
    train_set: &BinaryDataset,
    options: &TrainerOptions,
) -> Result<Classifier, TrainError> {
    match options.classifier {
        ClassifierKind::Logreg => {
            let logreg_options = logreg::TrainOptions {
                seed: options.seed,
                ..options.logreg.clone()
            };
            logreg::train_logreg(train_set, &logreg_options)
                .map(Classifier::Logreg)
                .map_err(TrainError::Fit)
        }
        ClassifierKind::GbdtStump => gbdt_stump::train_gbdt_stump(train_set, &options.gbdt)
            .map(Classifier::GbdtStump)
            .map_err(TrainError::Fit),
    }
}

fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{SourceFormat, parse_table};
    use crate::schema::FeatureRecord;

    fn labeled(line: usize, year: i32, funding: f64, industry: &str, succeeded: bool) -> LabeledRecord {
        LabeledRecord {
            line,
            record: FeatureRecord {
                founded_year: year,
                funding_usd: funding,
                industry: industry.to_string(),
                country: "USA".to_string(),
            },
            succeeded,
        }
    }

    fn rows() -> Vec<LabeledRecord> {
        (0..60)
            .map(|i| {
                let succeeded = i % 2 == 0;
                let funding = if succeeded { 5_000_000.0 } else { 50_000.0 } + i as f64;
                let industry = if succeeded { "IT" } else { "Retail" };
                labeled(i + 2, 2010 + (i as i32 % 10), funding, industry, succeeded)
            })
            .collect()
    }

    #[test]
    fn artifact_is_consistent_and_discriminates() {
        let trained = train_artifact(&rows(), &TrainerOptions::default(), "abc").unwrap();
        let artifact = &trained.artifact;
        assert!(artifact.check().is_ok());
        assert_eq!(artifact.training_rows, 60);
        assert_eq!(trained.train_rows + trained.validation_rows, 60);
        assert_eq!(artifact.training_fingerprint, "abc");
        assert!(artifact.metrics.roc_auc.unwrap() > 0.9);
    }

    #[test]
    fn gbdt_classifier_is_selectable() {
        let options = TrainerOptions {
            classifier: ClassifierKind::GbdtStump,
            ..TrainerOptions::default()
        };
        let trained = train_artifact(&rows(), &options, "abc").unwrap();
        assert_eq!(trained.artifact.classifier.kind(), ClassifierKind::GbdtStump);
    }

    #[test]
    fn retraining_reproduces_encoder_and_classifier() {
        let a = train_artifact(&rows(), &TrainerOptions::default(), "abc").unwrap();
        let b = train_artifact(&rows(), &TrainerOptions::default(), "abc").unwrap();
        assert_eq!(a.artifact.encoder, b.artifact.encoder);
        assert_eq!(a.artifact.layout, b.artifact.layout);
        assert_eq!(a.artifact.classifier, b.artifact.classifier);
        assert_ne!(a.artifact.model_id, b.artifact.model_id);
    }

    /// 10% successes; every feature cycles independently of the label.
    fn uninformative_rows() -> Vec<LabeledRecord> {
        let industries = ["IT", "Retail", "Healthcare"];
        let countries = ["USA", "India", "Germany", "France", "Brazil", "Japan", "Kenya"];
        (0..1000)
            .map(|i| LabeledRecord {
                line: i + 2,
                record: FeatureRecord {
                    founded_year: 2000 + (i % 13) as i32,
                    funding_usd: 10_000.0 * ((i % 11) + 1) as f64,
                    industry: industries[i % 3].to_string(),
                    country: countries[i % 7].to_string(),
                },
                succeeded: i % 10 == 0,
            })
            .collect()
    }

    fn mean_probability(artifact: &ModelArtifact, rows: &[LabeledRecord]) -> f32 {
        let total: f32 = rows
            .iter()
            .map(|row| {
                crate::inference::predict_record(artifact, &row.record)
                    .unwrap()
                    .success_probability
            })
            .sum();
        total / rows.len() as f32
    }

    #[test]
    fn probabilities_track_the_training_base_rate() {
        let rows = uninformative_rows();
        let trained = train_artifact(&rows, &TrainerOptions::default(), "abc").unwrap();
        let mean = mean_probability(&trained.artifact, &rows);
        assert!((mean - 0.1).abs() < 0.05, "mean probability {mean}");

        let mut balanced = TrainerOptions::default();
        balanced.logreg.balance_classes = true;
        let trained = train_artifact(&rows, &balanced, "abc").unwrap();
        let mean = mean_probability(&trained.artifact, &rows);
        assert!((mean - 0.1).abs() < 0.05, "balanced mean probability {mean}");

        let boosted = TrainerOptions {
            classifier: ClassifierKind::GbdtStump,
            ..TrainerOptions::default()
        };
        let trained = train_artifact(&rows, &boosted, "abc").unwrap();
        let mean = mean_probability(&trained.artifact, &rows);
        assert!((mean - 0.1).abs() < 0.05, "boosted mean probability {mean}");
    }

    #[test]
    fn single_outcome_trains_without_auc() {
        let rows: Vec<_> = rows().into_iter().filter(|row| row.succeeded).collect();
        let trained = train_artifact(&rows, &TrainerOptions::default(), "abc").unwrap();
        assert_eq!(trained.artifact.metrics.roc_auc, None);
    }

    #[test]
    fn single_row_has_no_validation_metrics() {
        let rows = vec![labeled(2, 2015, 1000.0, "IT", true)];
        let trained = train_artifact(&rows, &TrainerOptions::default(), "abc").unwrap();
        assert_eq!(trained.validation_rows, 0);
        assert_eq!(trained.artifact.metrics, ValidationMetrics::empty());
    }

    #[test]
    fn table_with_only_bad_rows_is_a_load_error() {
        let table = parse_table(
            b"founded_year,funding_usd,industry,country,status\nsoon,1,IT,USA,Succeeded\n",
            SourceFormat::Csv,
        )
        .unwrap();
        let err = Trainer::default().train_table(&table).unwrap_err();
        assert!(matches!(
            err,
            TrainError::DataLoad(DataLoadError::NoUsableRows { skipped: 1 })
        ));
    }
}
