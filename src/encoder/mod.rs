//! Deterministic encoding from validated records to model-ready vectors.
//!
//! Layout: `[founded_year, funding_usd, industry one-hot, country one-hot]`.
//! Numeric columns are standardized with parameters fitted at training time;
//! each one-hot block starts with the reserved unseen slot. The layout is
//! fingerprinted so an artifact can prove its encoder and classifier agree.

mod numeric;
mod vocabulary;

pub use numeric::{NumericScaler, NumericTransform};
pub use vocabulary::{CategoryVocabulary, UNSEEN_INDEX};

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::schema::{COUNTRY, FOUNDED_YEAR, FUNDING_USD, FeatureRecord, INDUSTRY};

/// Version of the feature layout produced by this code.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// The encoder in use does not match the layout the artifact declares.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Feature layout mismatch: {detail}")]
pub struct SchemaMismatchError {
    pub detail: String,
}

impl SchemaMismatchError {
    fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Declared column layout of a feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub schema_version: String,
    pub columns: Vec<String>,
    /// SHA-256 (hex) over the schema version and column names.
    pub fingerprint: String,
}

impl FeatureLayout {
    fn new(schema_version: &str, columns: Vec<String>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(schema_version.as_bytes());
        for column in &columns {
            hasher.update(b"\n");
            hasher.update(column.as_bytes());
        }
        Self {
            schema_version: schema_version.to_string(),
            columns,
            fingerprint: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Fixed-length numeric input for the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Best-effort reconstruction of a record from its vector, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedFeatures {
    pub founded_year: f64,
    pub funding_usd: f64,
    /// `None` when the unseen slot (or no slot) is hot.
    pub industry: Option<String>,
    pub country: Option<String>,
}

/// Layout derived from the fitted state on first use. Never serialized and
/// ignored by equality; fitted fields must not change after it is filled.
#[derive(Debug, Clone, Default)]
struct LayoutCache(OnceLock<FeatureLayout>);

impl PartialEq for LayoutCache {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Fitted encoder state, embedded verbatim in the model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoder {
    pub schema_version: String,
    pub founded_year: NumericScaler,
    pub funding_usd: NumericScaler,
    pub industry: CategoryVocabulary,
    pub country: CategoryVocabulary,
    #[serde(skip)]
    layout_cache: LayoutCache,
}

impl Encoder {
    /// Fit vocabularies and scalers on the surviving training rows.
    pub fn fit(records: &[FeatureRecord]) -> Result<Self, String> {
        if records.is_empty() {
            return Err("Cannot fit encoder on an empty training set".to_string());
        }
        let years: Vec<f64> = records.iter().map(|r| r.founded_year as f64).collect();
        let funding: Vec<f64> = records.iter().map(|r| r.funding_usd).collect();
        Ok(Self {
            schema_version: SCHEMA_VERSION.to_string(),
            founded_year: NumericScaler::fit(FOUNDED_YEAR, NumericTransform::Identity, &years),
            funding_usd: NumericScaler::fit(FUNDING_USD, NumericTransform::Log1p, &funding),
            industry: CategoryVocabulary::fit(INDUSTRY, records.iter().map(|r| r.industry.as_str())),
            country: CategoryVocabulary::fit(COUNTRY, records.iter().map(|r| r.country.as_str())),
            layout_cache: LayoutCache::default(),
        })
    }

    /// Column layout implied by the fitted vocabularies.
    pub fn layout(&self) -> FeatureLayout {
        self.cached_layout().clone()
    }

    /// Borrowed layout, built and fingerprinted once per encoder.
    pub fn cached_layout(&self) -> &FeatureLayout {
        self.layout_cache.0.get_or_init(|| {
            let mut columns = vec![FOUNDED_YEAR.to_string(), FUNDING_USD.to_string()];
            columns.extend(self.industry.column_names());
            columns.extend(self.country.column_names());
            FeatureLayout::new(&self.schema_version, columns)
        })
    }

    pub fn feature_len(&self) -> usize {
        2 + self.industry.width() + self.country.width()
    }

    /// Encode a record. Pure: depends only on fitted state and `record`.
    pub fn transform(&self, record: &FeatureRecord) -> FeatureVector {
        let mut values = vec![0.0f32; self.feature_len()];
        values[0] = self.founded_year.apply(record.founded_year as f64);
        values[1] = self.funding_usd.apply(record.funding_usd);
        let industry_base = 2;
        let country_base = industry_base + self.industry.width();
        values[industry_base + self.industry.index_of(&record.industry)] = 1.0;
        values[country_base + self.country.index_of(&record.country)] = 1.0;
        FeatureVector(values)
    }

    /// Encode after confirming this encoder produces the `expected` layout.
    pub fn transform_checked(
        &self,
        record: &FeatureRecord,
        expected: &FeatureLayout,
    ) -> Result<FeatureVector, SchemaMismatchError> {
        self.ensure_layout(expected)?;
        Ok(self.transform(record))
    }

    pub fn ensure_layout(&self, expected: &FeatureLayout) -> Result<(), SchemaMismatchError> {
        let actual = self.cached_layout();
        if actual.schema_version != expected.schema_version {
            return Err(SchemaMismatchError::new(format!(
                "encoder schema {} but artifact declares {}",
                actual.schema_version, expected.schema_version
            )));
        }
        if actual.width() != expected.width() || actual.fingerprint != expected.fingerprint {
            return Err(SchemaMismatchError::new(format!(
                "encoder layout {} ({} columns) but artifact declares {} ({} columns)",
                short(&actual.fingerprint),
                actual.width(),
                short(&expected.fingerprint),
                expected.width()
            )));
        }
        Ok(())
    }

    /// Categorical fields of `record` that fall back to the unseen slot.
    pub fn unseen_fields(&self, record: &FeatureRecord) -> Vec<&'static str> {
        let mut unseen = Vec::new();
        if self.industry.index_of(&record.industry) == UNSEEN_INDEX {
            unseen.push(INDUSTRY);
        }
        if self.country.index_of(&record.country) == UNSEEN_INDEX {
            unseen.push(COUNTRY);
        }
        unseen
    }

    /// Reverse the encoding for diagnostics.
    pub fn inverse(&self, vector: &FeatureVector) -> Result<DecodedFeatures, SchemaMismatchError> {
        if vector.len() != self.feature_len() {
            return Err(SchemaMismatchError::new(format!(
                "vector has {} values, encoder expects {}",
                vector.len(),
                self.feature_len()
            )));
        }
        let values = vector.as_slice();
        let industry_base = 2;
        let country_base = industry_base + self.industry.width();
        let industry_block = &values[industry_base..country_base];
        let country_block = &values[country_base..];
        Ok(DecodedFeatures {
            founded_year: self.founded_year.invert(values[0]),
            funding_usd: self.funding_usd.invert(values[1]),
            industry: hot_index(industry_block)
                .and_then(|idx| self.industry.value_at(idx))
                .map(str::to_string),
            country: hot_index(country_block)
                .and_then(|idx| self.country.value_at(idx))
                .map(str::to_string),
        })
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        self.founded_year.validate()?;
        self.funding_usd.validate()?;
        self.industry.validate()?;
        self.country.validate()?;
        Ok(())
    }
}

fn hot_index(block: &[f32]) -> Option<usize> {
    block.iter().position(|&v| v > 0.5)
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
