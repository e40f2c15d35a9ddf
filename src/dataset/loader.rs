//! Loader for historical startup outcome tables.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::csv::parse_csv;

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("Failed to read training data {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unsupported training data format for {0} (expected .csv, .jsonl, .ndjson or .json)")]
    UnsupportedFormat(PathBuf),
    #[error("Training data is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("Malformed CSV at line {line}: {message}")]
    Csv { line: usize, message: String },
    #[error("Malformed JSON at line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
    #[error("Line {line} is not a JSON object")]
    NotAnObject { line: usize },
    #[error("Training data has no rows")]
    Empty,
    #[error("No usable rows after validation ({skipped} skipped)")]
    NoUsableRows { skipped: usize },
}

/// Source format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    JsonLines,
    JsonArray,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "jsonl" | "ndjson" => Some(SourceFormat::JsonLines),
            "json" => Some(SourceFormat::JsonArray),
            _ => None,
        }
    }
}

/// One raw row with its 1-based source line (CSV/JSONL) or array position.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub line: usize,
    pub fields: Map<String, Value>,
}

/// Raw rows plus a fingerprint of the exact source bytes.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub rows: Vec<RawRow>,
    /// SHA-256 (hex) of the source file contents.
    pub fingerprint: String,
}

/// Read and parse a training table; rows are not validated here.
pub fn load_table(path: &Path) -> Result<RawTable, DataLoadError> {
    let format = SourceFormat::from_path(path)
        .ok_or_else(|| DataLoadError::UnsupportedFormat(path.to_path_buf()))?;
    let bytes = std::fs::read(path).map_err(|source| DataLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table(&bytes, format)
}

/// Parse in-memory bytes in the given format.
pub fn parse_table(bytes: &[u8], format: SourceFormat) -> Result<RawTable, DataLoadError> {
    let fingerprint = fingerprint_bytes(bytes);
    let text = String::from_utf8(bytes.to_vec())?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let rows = match format {
        SourceFormat::Csv => parse_csv(text)?,
        SourceFormat::JsonLines => parse_json_lines(text)?,
        SourceFormat::JsonArray => parse_json_array(text)?,
    };
    if rows.is_empty() {
        return Err(DataLoadError::Empty);
    }
    Ok(RawTable { rows, fingerprint })
}

pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn parse_json_lines(text: &str) -> Result<Vec<RawRow>, DataLoadError> {
    let mut rows = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|source| DataLoadError::Json {
            line: line_no,
            source,
        })?;
        match value {
            Value::Object(fields) => rows.push(RawRow {
                line: line_no,
                fields,
            }),
            _ => return Err(DataLoadError::NotAnObject { line: line_no }),
        }
    }
    Ok(rows)
}

fn parse_json_array(text: &str) -> Result<Vec<RawRow>, DataLoadError> {
    let values: Vec<Value> =
        serde_json::from_str(text).map_err(|source| DataLoadError::Json { line: 1, source })?;
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Value::Object(fields) => Ok(RawRow {
                line: idx + 1,
                fields,
            }),
            _ => Err(DataLoadError::NotAnObject { line: idx + 1 }),
        })
        .collect()
}
