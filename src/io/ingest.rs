//! CSV ingest.
//!
//! This module turns a delimited measurement file into `MeasurementRow`s.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip unparseable rows, but report what happened)
//! - **Missing is not invalid**: empty cells become `None` and are judged later
//!   by the cohort filter / feature builder
//! - **Separation of concerns**: no filtering or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use csv::StringRecord;

use crate::domain::MeasurementRow;
use crate::error::PipelineError;

/// Required columns, by normalized header name.
const REQUIRED_COLUMNS: [(&str, &str); 7] = [
    ("treeid", "TreeID"),
    ("age", "Age"),
    ("year", "Year"),
    ("treatment", "Treatment"),
    ("diameter", "Diameter"),
    ("height", "Height"),
    ("weight", "Weight"),
];

/// Row-level issue encountered during ingest (the row is skipped).
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: parsed rows + row errors.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub rows: Vec<MeasurementRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Load the measurement CSV at `path`.
pub fn load_measurements(path: &Path) -> Result<IngestedData, PipelineError> {
    let unreadable = |source: std::io::Error| PipelineError::InputUnreadable {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PipelineError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => unreadable(e),
    })?;
    // Opening a directory succeeds on some platforms; reading it does not.
    if file.metadata().map_err(unreadable)?.is_dir() {
        return Err(unreadable(ErrorKind::IsADirectory.into()));
    }

    let data = read_measurements(file)?;
    log::info!(
        "Loaded {} of {} rows from {}",
        data.rows.len(),
        data.rows_read,
        path.display()
    );
    Ok(data)
}

/// Parse measurement rows from any CSV source.
pub fn read_measurements<R: Read>(source: R) -> Result<IngestedData, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::MalformedInput(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Blank lines and multi-line quoted cells make the record index drift
        // from the physical line; prefer the reader's own position.
        let fallback_line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line: e.position().map_or(fallback_line, |p| p.line() as usize),
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let line = record.position().map_or(fallback_line, |p| p.line() as usize);
        match parse_row(&record, &header_map, line) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError {
                line,
                id: get_optional(&record, &header_map, "treeid").map(str::to_string),
                message,
            }),
        }
    }

    for e in &row_errors {
        log::warn!(
            "Skipping line {}{}: {}",
            e.line,
            e.id.as_deref().map(|id| format!(" (TreeID {id})")).unwrap_or_default(),
            e.message
        );
    }

    Ok(IngestedData {
        rows,
        row_errors,
        rows_read,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.chars()
        .filter(|c| !matches!(c, '_' | ' ' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), PipelineError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|(key, _)| !header_map.contains_key(*key))
        .map(|(_, label)| *label)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MalformedInput(format!(
            "Missing required column(s): {}",
            missing.join(", ")
        )))
    }
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>, line: usize) -> Result<MeasurementRow, String> {
    let tree_id = get_optional(record, header_map, "treeid")
        .ok_or_else(|| "Missing required value: `TreeID`".to_string())?
        .to_string();

    Ok(MeasurementRow {
        tree_id,
        line,
        age: parse_opt_class(get_optional(record, header_map, "age"), "Age")?,
        year: parse_opt_class(get_optional(record, header_map, "year"), "Year")?,
        treatment: parse_opt_class(get_optional(record, header_map, "treatment"), "Treatment")?,
        diameter: parse_opt_f64(get_optional(record, header_map, "diameter"), "Diameter")?,
        height: parse_opt_f64(get_optional(record, header_map, "height"), "Height")?,
        weight: parse_opt_f64(get_optional(record, header_map, "weight"), "Weight")?,
    })
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_na(s))
}

fn is_na(s: &str) -> bool {
    s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan")
}

fn parse_opt_f64(s: Option<&str>, column: &str) -> Result<Option<f64>, String> {
    let Some(s) = s else { return Ok(None) };
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid `{column}` value '{s}'."))?;
    if v.is_finite() {
        Ok(Some(v))
    } else {
        Err(format!("Non-finite `{column}` value '{s}'."))
    }
}

/// Integer class codes; integral reals such as `3.0` are accepted.
fn parse_opt_class(s: Option<&str>, column: &str) -> Result<Option<i64>, String> {
    let Some(s) = s else { return Ok(None) };
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Some(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(Some(v as i64)),
        _ => Err(format!("Invalid `{column}` class '{s}' (expected an integer).")),
    }
}
