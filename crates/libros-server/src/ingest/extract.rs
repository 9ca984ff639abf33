//! First-sheet spreadsheet reader
//!
//! The first row of the used range is the header. Every later row becomes one
//! [`Record`] keyed by header text, in column order:
//!
//! - blank header cells are named `__EMPTY`, `__EMPTY_1`, ...
//! - repeated header names get `_1`, `_2`, ... suffixes
//! - empty and error cells are left out of the record
//! - rows with no remaining cells are skipped
//! - integral numbers become JSON integers, dates their serial number

use calamine::{open_workbook_auto, Data, Reader};
use libros_common::types::Record;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Header assigned to blank header cells
const EMPTY_HEADER: &str = "__EMPTY";

/// Largest integer an `f64` holds exactly (2^53)
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Cannot read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("Workbook has no sheets")]
    NoSheets,
}

/// Read the first sheet of the workbook at `path`.
///
/// The format (`.xlsx`, `.xls`, `.ods`, ...) is detected from the file itself.
pub fn extract_records(path: &Path) -> Result<Vec<Record>, ExtractError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ExtractError::NoSheets)??;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers = build_headers(header_row);

    let records = rows
        .filter_map(|row| {
            let record: Record = headers
                .iter()
                .zip(row)
                .filter_map(|(header, cell)| cell_value(cell).map(|v| (header.clone(), v)))
                .collect();
            (!record.is_empty()).then_some(record)
        })
        .collect();

    Ok(records)
}

fn build_headers(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(row.len());

    for cell in row {
        let base = header_text(cell);
        let name = match seen.get(&base).copied() {
            None => {
                seen.insert(base.clone(), 1);
                base
            },
            Some(mut counter) => {
                let mut candidate = format!("{}_{}", base, counter);
                while seen.contains_key(&candidate) {
                    counter += 1;
                    candidate = format!("{}_{}", base, counter);
                }
                seen.insert(base, counter + 1);
                seen.insert(candidate.clone(), 1);
                candidate
            },
        };
        headers.push(name);
    }

    headers
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        Some(Value::String(s)) => s,
        Some(Value::Bool(true)) => "TRUE".to_string(),
        Some(Value::Bool(false)) => "FALSE".to_string(),
        Some(other) => other.to_string(),
        None => EMPTY_HEADER.to_string(),
    }
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            Some(Value::String(s.clone()))
        },
        Data::Int(i) => Some(Value::from(*i)),
        Data::Float(f) => number_value(*f),
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::DateTime(dt) => number_value(dt.as_f64()),
    }
}

fn number_value(f: f64) -> Option<Value> {
    if f.fract() == 0.0 && f.abs() <= MAX_EXACT_INTEGER {
        Some(Value::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number)
    }
}
