//! Feature schema for startup observations.
//!
//! Validation is purely structural: presence, type and basic numeric sanity.
//! Categorical membership is left to the encoder so unseen industries or
//! countries degrade gracefully instead of rejecting the request.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Field carrying the founding year.
pub const FOUNDED_YEAR: &str = "founded_year";
/// Field carrying total funding in US dollars.
pub const FUNDING_USD: &str = "funding_usd";
/// Categorical industry field.
pub const INDUSTRY: &str = "industry";
/// Categorical country field.
pub const COUNTRY: &str = "country";

/// Recognized input fields in canonical order.
pub const FEATURE_FIELDS: [&str; 4] = [FOUNDED_YEAR, FUNDING_USD, INDUSTRY, COUNTRY];

/// One validated startup observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub founded_year: i32,
    pub funding_usd: f64,
    pub industry: String,
    pub country: String,
}

/// What was wrong with a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldProblem {
    Missing,
    NotNumber,
    NotInteger,
    OutOfRange,
    Negative,
    NotFinite,
    NotString,
    Empty,
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FieldProblem::Missing => "is required",
            FieldProblem::NotNumber => "must be a number",
            FieldProblem::NotInteger => "must be a whole number",
            FieldProblem::OutOfRange => "is out of range",
            FieldProblem::Negative => "must not be negative",
            FieldProblem::NotFinite => "must be finite",
            FieldProblem::NotString => "must be a string",
            FieldProblem::Empty => "must not be empty",
        };
        f.write_str(text)
    }
}

/// A problem attached to a named field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub problem: FieldProblem,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.problem)
    }
}

/// Malformed or missing client input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid input: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Error for a payload that is not a JSON object at all.
    pub fn not_an_object() -> Self {
        Self {
            issues: FEATURE_FIELDS
                .iter()
                .map(|&field| FieldIssue {
                    field,
                    problem: FieldProblem::Missing,
                })
                .collect(),
        }
    }

    /// Names of the offending fields, in schema order.
    pub fn fields(&self) -> Vec<&'static str> {
        self.issues.iter().map(|issue| issue.field).collect()
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate any JSON value; non-objects fail on every field.
pub fn validate_value(value: &Value) -> Result<FeatureRecord, ValidationError> {
    match value.as_object() {
        Some(fields) => validate_record(fields),
        None => Err(ValidationError::not_an_object()),
    }
}

/// Validate a raw record, collecting every field problem.
///
/// Numbers may arrive as JSON numbers or numeric strings (form posts and CSV
/// cells are text). Unknown extra fields are ignored.
pub fn validate_record(fields: &Map<String, Value>) -> Result<FeatureRecord, ValidationError> {
    let mut issues = Vec::new();
    let founded_year = collect(&mut issues, FOUNDED_YEAR, parse_year(fields.get(FOUNDED_YEAR)));
    let funding_usd = collect(&mut issues, FUNDING_USD, parse_funding(fields.get(FUNDING_USD)));
    let industry = collect(&mut issues, INDUSTRY, parse_label(fields.get(INDUSTRY)));
    let country = collect(&mut issues, COUNTRY, parse_label(fields.get(COUNTRY)));

    match (founded_year, funding_usd, industry, country) {
        (Some(founded_year), Some(funding_usd), Some(industry), Some(country)) => {
            Ok(FeatureRecord {
                founded_year,
                funding_usd,
                industry,
                country,
            })
        }
        _ => Err(ValidationError { issues }),
    }
}

fn collect<T>(
    issues: &mut Vec<FieldIssue>,
    field: &'static str,
    parsed: Result<T, FieldProblem>,
) -> Option<T> {
    match parsed {
        Ok(value) => Some(value),
        Err(problem) => {
            issues.push(FieldIssue { field, problem });
            None
        }
    }
}

fn parse_number(value: Option<&Value>) -> Result<f64, FieldProblem> {
    match value {
        None | Some(Value::Null) => Err(FieldProblem::Missing),
        Some(Value::Number(number)) => number.as_f64().ok_or(FieldProblem::NotNumber),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(FieldProblem::Missing);
            }
            text.parse::<f64>().map_err(|_| FieldProblem::NotNumber)
        }
        Some(_) => Err(FieldProblem::NotNumber),
    }
}

fn parse_year(value: Option<&Value>) -> Result<i32, FieldProblem> {
    let year = parse_number(value)?;
    if !year.is_finite() {
        return Err(FieldProblem::NotFinite);
    }
    if year.fract() != 0.0 {
        return Err(FieldProblem::NotInteger);
    }
    if year < i32::MIN as f64 || year > i32::MAX as f64 {
        return Err(FieldProblem::OutOfRange);
    }
    Ok(year as i32)
}

fn parse_funding(value: Option<&Value>) -> Result<f64, FieldProblem> {
    let amount = parse_number(value)?;
    if !amount.is_finite() {
        return Err(FieldProblem::NotFinite);
    }
    if amount < 0.0 {
        return Err(FieldProblem::Negative);
    }
    Ok(amount)
}

fn parse_label(value: Option<&Value>) -> Result<String, FieldProblem> {
    match value {
        None | Some(Value::Null) => Err(FieldProblem::Missing),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                Err(FieldProblem::Empty)
            } else {
                Ok(text.to_string())
            }
        }
        Some(_) => Err(FieldProblem::NotString),
    }
}
