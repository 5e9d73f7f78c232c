//! Loading JSON records from export files.
//!
//! Exports arrive either as one JSON array or as newline-delimited JSON.
//! The format is chosen by peeking at the first byte of the stream.

use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ConvertError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// The whole stream is a single JSON array
    JsonArray,
    /// One JSON value per line
    NdJson,
}

/// A line that could not be parsed and was left out of the records.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    pub line_number: usize,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct LoadedRecords {
    pub records: Vec<Value>,
    /// Source line of each record (1-based). Array elements are numbered
    /// by position since they share one document.
    pub record_lines: Vec<usize>,
    pub skipped: Vec<SkippedLine>,
}

/// Look at the first byte without consuming it.
///
/// `fill_buf` leaves the buffer in place, so the parser that runs next
/// still sees the complete input.
pub fn detect_format<R: BufRead>(reader: &mut R) -> io::Result<InputFormat> {
    let buf = reader.fill_buf()?;
    Ok(match buf.first() {
        Some(b'[') => InputFormat::JsonArray,
        _ => InputFormat::NdJson,
    })
}

/// Read every record from `reader`, detecting the format first.
pub fn read_records<R: BufRead>(mut reader: R) -> Result<LoadedRecords> {
    match detect_format(&mut reader)? {
        InputFormat::JsonArray => read_json_array(reader),
        InputFormat::NdJson => read_ndjson(reader),
    }
}

pub fn read_records_from_path(path: &Path) -> Result<LoadedRecords> {
    let file = File::open(path)?;
    read_records(BufReader::new(file))
}

/// Parse the whole stream as one JSON document which must be an array.
/// Any syntax error fails the entire stream.
pub fn read_json_array<R: BufRead>(reader: R) -> Result<LoadedRecords> {
    let value: Value = serde_json::from_reader(reader)?;
    match value {
        Value::Array(records) => {
            debug!("Loaded {} records from JSON array", records.len());
            Ok(LoadedRecords {
                record_lines: (1..=records.len()).collect(),
                records,
                skipped: Vec::new(),
            })
        }
        _ => Err(ConvertError::NotAnArray),
    }
}

/// Parse each line as an independent JSON value.
///
/// Blank lines are ignored. Lines that fail to parse are collected in
/// `skipped` and reading carries on with the next line.
pub fn read_ndjson<R: BufRead>(reader: R) -> Result<LoadedRecords> {
    let mut loaded = LoadedRecords::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => {
                loaded.records.push(value);
                loaded.record_lines.push(index + 1);
            }
            Err(e) => {
                let line_number = index + 1;
                warn!(line_number, error = %e, "Skipping invalid JSON line");
                loaded.skipped.push(SkippedLine {
                    line_number,
                    message: e.to_string(),
                });
            }
        }
    }

    debug!(
        "Loaded {} NDJSON records ({} lines skipped)",
        loaded.records.len(),
        loaded.skipped.len()
    );
    Ok(loaded)
}
