//! Minimal CSV reader: header row, comma separator, RFC 4180 quoting.

use serde_json::{Map, Value};

use super::loader::{DataLoadError, RawRow};

/// Parse CSV text into rows keyed by the (trimmed) header names.
///
/// Cells become JSON strings; empty cells are omitted so they read as missing.
pub(super) fn parse_csv(text: &str) -> Result<Vec<RawRow>, DataLoadError> {
    let records = split_records(text)?;
    let mut iter = records.into_iter();
    let Some((_, header)) = iter.next() else {
        return Ok(Vec::new());
    };
    let header: Vec<String> = header.iter().map(|name| name.trim().to_string()).collect();
    if header.iter().all(|name| name.is_empty()) {
        return Err(DataLoadError::Csv {
            line: 1,
            message: "missing header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (line, cells) in iter {
        if cells.len() == 1 && cells[0].trim().is_empty() {
            continue;
        }
        if cells.len() > header.len() {
            return Err(DataLoadError::Csv {
                line,
                message: format!("expected {} columns, found {}", header.len(), cells.len()),
            });
        }
        let mut fields = Map::new();
        for (name, cell) in header.iter().zip(cells) {
            if name.is_empty() || cell.trim().is_empty() {
                continue;
            }
            fields.insert(name.clone(), Value::String(cell));
        }
        rows.push(RawRow { line, fields });
    }
    Ok(rows)
}

/// Split into records of cells, tracking the line each record starts on.
fn split_records(text: &str) -> Result<Vec<(usize, Vec<String>)>, DataLoadError> {
    let mut records = Vec::new();
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut record_line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    cell.push('\n');
                }
                _ => cell.push(ch),
            }
            continue;
        }
        match ch {
            '"' if cell.trim().is_empty() => {
                cell.clear();
                in_quotes = true;
            }
            ',' => cells.push(std::mem::take(&mut cell)),
            '\r' => {}
            '\n' => {
                cells.push(std::mem::take(&mut cell));
                records.push((record_line, std::mem::take(&mut cells)));
                line += 1;
                record_line = line;
            }
            _ => cell.push(ch),
        }
    }
    if in_quotes {
        return Err(DataLoadError::Csv {
            line: record_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !cell.is_empty() || !cells.is_empty() {
        cells.push(cell);
        records.push((record_line, cells));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows() {
        let text = "founded_year,funding_usd,industry,country,status\r\n\
                    2015,1000000,IT,USA,Succeeded\r\n\
                    2018,250000,Healthcare,India,Failed\r\n";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].fields["industry"], Value::String("IT".into()));
        assert_eq!(rows[1].fields["status"], Value::String("Failed".into()));
    }

    #[test]
    fn quoted_cells_keep_commas_quotes_and_newlines() {
        let text = "name,industry\n\"Acme, Inc.\",\"Say \"\"hi\"\"\"\n\"multi\nline\",IT\nlast,Retail\n";
        let rows = parse_csv(text).unwrap();
        assert_eq!(rows[0].fields["name"], Value::String("Acme, Inc.".into()));
        assert_eq!(rows[0].fields["industry"], Value::String("Say \"hi\"".into()));
        assert_eq!(rows[1].fields["name"], Value::String("multi\nline".into()));
        assert_eq!(rows[2].line, 5);
    }

    #[test]
    fn empty_cells_read_as_missing_and_blank_lines_are_skipped() {
        let rows = parse_csv("a,b\n1,\n\n2,3").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].fields.contains_key("b"));
        assert_eq!(rows[1].fields["b"], Value::String("3".into()));
    }

    #[test]
    fn unterminated_quote_and_extra_columns_fail() {
        assert!(matches!(
            parse_csv("a\n\"oops"),
            Err(DataLoadError::Csv { line: 2, .. })
        ));
        assert!(matches!(
            parse_csv("a,b\n1,2,3\n"),
            Err(DataLoadError::Csv { line: 2, .. })
        ));
    }
}
