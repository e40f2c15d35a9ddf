//! Historical labeled records consumed by the trainer.
//!
//! Loading is split from validation: the loader only parses the source into
//! raw rows, and [`validate_rows`] applies the feature schema plus label
//! parsing with a skip-and-count policy so bad rows are reported, never
//! patched up.

mod csv;
pub mod loader;
pub mod split;

use serde_json::{Map, Value};

use crate::schema::{self, FeatureRecord, ValidationError};

pub use loader::{DataLoadError, RawRow, RawTable, SourceFormat, load_table, parse_table};

/// Columns holding an explicit binary outcome, checked in order.
pub const BINARY_LABEL_COLUMNS: [&str; 3] = ["succeeded", "label", "success"];
/// Free-text status column; `"Succeeded"` marks success.
pub const STATUS_COLUMN: &str = "status";
pub const SUCCESS_STATUS: &str = "Succeeded";

/// A validated training row.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRecord {
    pub line: usize,
    pub record: FeatureRecord,
    pub succeeded: bool,
}

/// Why a row was left out of training.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Schema(ValidationError),
    MissingLabel,
    InvalidLabel(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Schema(err) => write!(f, "{err}"),
            SkipReason::MissingLabel => write!(
                f,
                "no outcome column ({}, or {STATUS_COLUMN})",
                BINARY_LABEL_COLUMNS.join(", ")
            ),
            SkipReason::InvalidLabel(value) => write!(f, "unrecognized outcome value {value:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: SkipReason,
}

/// Outcome of validating a raw table.
#[derive(Debug, Clone, Default)]
pub struct ValidatedRows {
    pub rows: Vec<LabeledRecord>,
    pub skipped: Vec<SkippedRow>,
}

/// Validate every raw row, keeping the good ones and recording the rest.
pub fn validate_rows(raw: &[RawRow]) -> ValidatedRows {
    let mut out = ValidatedRows::default();
    for row in raw {
        let label = parse_label(&row.fields);
        let record = schema::validate_record(&row.fields);
        match (record, label) {
            (Ok(record), Ok(succeeded)) => out.rows.push(LabeledRecord {
                line: row.line,
                record,
                succeeded,
            }),
            (Err(err), _) => out.skipped.push(SkippedRow {
                line: row.line,
                reason: SkipReason::Schema(err),
            }),
            (Ok(_), Err(reason)) => out.skipped.push(SkippedRow {
                line: row.line,
                reason,
            }),
        }
    }
    out
}

/// Read the outcome of a row.
///
/// Binary columns accept `1/0`, `true/false`, `yes/no`. Otherwise `status`
/// is used: `Succeeded` (any case) is a success, any other status a failure.
pub fn parse_label(fields: &Map<String, Value>) -> Result<bool, SkipReason> {
    for column in BINARY_LABEL_COLUMNS {
        let Some(value) = fields.get(column) else {
            continue;
        };
        return match value {
            Value::Bool(flag) => Ok(*flag),
            Value::Number(number) => match number.as_f64() {
                Some(v) if v == 1.0 => Ok(true),
                Some(v) if v == 0.0 => Ok(false),
                _ => Err(SkipReason::InvalidLabel(number.to_string())),
            },
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" => Ok(false),
                _ => Err(SkipReason::InvalidLabel(text.clone())),
            },
            Value::Null => continue,
            other => Err(SkipReason::InvalidLabel(other.to_string())),
        };
    }
    match fields.get(STATUS_COLUMN) {
        Some(Value::String(status)) if !status.trim().is_empty() => {
            Ok(status.trim().eq_ignore_ascii_case(SUCCESS_STATUS))
        }
        Some(Value::Null) | None => Err(SkipReason::MissingLabel),
        Some(Value::String(_)) => Err(SkipReason::MissingLabel),
        Some(other) => Err(SkipReason::InvalidLabel(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(line: usize, value: Value) -> RawRow {
        RawRow {
            line,
            fields: value.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn status_column_follows_succeeded_convention() {
        let fields = json!({"status": "succeeded"});
        assert_eq!(parse_label(fields.as_object().unwrap()), Ok(true));
        let fields = json!({"status": "Acquired"});
        assert_eq!(parse_label(fields.as_object().unwrap()), Ok(false));
    }

    #[test]
    fn binary_columns_take_precedence() {
        let fields = json!({"succeeded": "1", "status": "Failed"});
        assert_eq!(parse_label(fields.as_object().unwrap()), Ok(true));
        let fields = json!({"label": 0});
        assert_eq!(parse_label(fields.as_object().unwrap()), Ok(false));
        let fields = json!({"success": "maybe"});
        assert!(matches!(
            parse_label(fields.as_object().unwrap()),
            Err(SkipReason::InvalidLabel(_))
        ));
    }

    #[test]
    fn missing_outcome_is_reported() {
        let fields = json!({"industry": "IT"});
        assert_eq!(
            parse_label(fields.as_object().unwrap()),
            Err(SkipReason::MissingLabel)
        );
    }

    #[test]
    fn validation_skips_and_counts_bad_rows() {
        let raw = vec![
            row(2, json!({"founded_year": "2015", "funding_usd": "100", "industry": "IT", "country": "USA", "status": "Succeeded"})),
            row(3, json!({"founded_year": "2016", "funding_usd": "100", "industry": "IT", "status": "Failed"})),
            row(4, json!({"founded_year": "2017", "funding_usd": "100", "industry": "IT", "country": "USA"})),
        ];
        let validated = validate_rows(&raw);
        assert_eq!(validated.rows.len(), 1);
        assert!(validated.rows[0].succeeded);
        assert_eq!(validated.skipped.len(), 2);
        assert_eq!(validated.skipped[0].line, 3);
        assert!(matches!(validated.skipped[0].reason, SkipReason::Schema(_)));
        assert_eq!(validated.skipped[1].reason, SkipReason::MissingLabel);
        assert!(validated.skipped[0].reason.to_string().contains("country"));
    }
}
