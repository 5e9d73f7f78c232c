use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::config::FlattenConfig;
use crate::constants::{CSV_EXTENSION, JSON_EXTENSION};
use crate::error::Result;
use crate::flatten::flatten_records;
use crate::ingest::{self, SkippedLine};
use crate::normalize::to_snake_case;
use crate::observability::metrics;
use crate::table::Table;

/// Outcome of converting one JSON file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub input_name: String,
    pub output_path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    pub dropped_column: bool,
    pub truncated_cells: usize,
    pub skipped_lines: Vec<SkippedLine>,
}

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub input_name: String,
    pub error: String,
}

/// Result of a complete run over the input directory
#[derive(Debug, Default)]
pub struct FlattenSummary {
    pub processed: Vec<FileReport>,
    pub failed: Vec<FileFailure>,
}

impl FlattenSummary {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}

/// A flattened, renamed and cleaned table ready to be written.
#[derive(Debug)]
pub struct Transformed {
    pub table: Table,
    pub dropped_column: bool,
    pub truncated_cells: usize,
}

/// Convert every `.json` file in the input directory into a CSV.
///
/// A failing file is reported and skipped; only problems with the
/// directories themselves abort the run.
#[instrument(skip(config), fields(input_dir = %config.input_dir.display()))]
pub fn run(config: &FlattenConfig) -> Result<FlattenSummary> {
    fs::create_dir_all(&config.output_dir)?;
    let files = list_json_files(&config.input_dir)?;
    info!("Found {} JSON files", files.len());

    let mut summary = FlattenSummary::default();
    for path in files {
        let input_name = file_name(&path);
        let started = Instant::now();

        match convert_file(&path, config) {
            Ok(report) => {
                metrics::flatten::file_converted(report.rows, started.elapsed().as_secs_f64());
                metrics::flatten::lines_skipped(report.skipped_lines.len());
                metrics::flatten::cells_truncated(report.truncated_cells);
                info!(
                    file = %input_name,
                    rows = report.rows,
                    columns = report.columns,
                    "File converted"
                );
                println!("✅ Processed: {} → {}", input_name, file_name(&report.output_path));
                summary.processed.push(report);
            }
            Err(e) => {
                metrics::flatten::file_failed();
                error!(file = %input_name, error = %e, "File conversion failed");
                println!("❌ Error processing {}: {}", input_name, e);
                summary.failed.push(FileFailure {
                    input_name,
                    error: e.to_string(),
                });
            }
        }
    }

    println!(
        "🎯 Converted {} of {} JSON files to CSV ({} failed)",
        summary.processed.len(),
        summary.total(),
        summary.failed.len()
    );
    Ok(summary)
}

/// Regular files in `dir` whose name ends in `.json`, sorted by name.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_json = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(JSON_EXTENSION));
        if is_json && path.is_file() {
            files.push(path);
        } else {
            debug!("Ignoring {}", path.display());
        }
    }
    files.sort();
    Ok(files)
}

/// `users.json` -> `users.csv`. Only the trailing extension is replaced.
pub fn output_file_name(input_name: &str) -> String {
    let stem = input_name.strip_suffix(JSON_EXTENSION).unwrap_or(input_name);
    format!("{stem}{CSV_EXTENSION}")
}

/// Load, transform and write a single file.
pub fn convert_file(path: &Path, config: &FlattenConfig) -> Result<FileReport> {
    let input_name = file_name(path);
    let loaded = ingest::read_records_from_path(path)?;
    for skipped in &loaded.skipped {
        warn!(file = %input_name, line = skipped.line_number, "Skipped invalid JSON line");
        println!(
            "⚠️  Skipped invalid JSON line {} in {}: {}",
            skipped.line_number, input_name, skipped.message
        );
    }

    let transformed = transform_records(&loaded.records, config)?;
    if transformed.dropped_column {
        println!("🚨 Dropped column: {} from {}", config.column_to_drop, input_name);
    }
    if transformed.truncated_cells > 0 {
        warn!(
            file = %input_name,
            cells = transformed.truncated_cells,
            max_len = config.max_field_length,
            "Truncated long fields"
        );
    }

    let output_path = config.output_dir.join(output_file_name(&input_name));
    transformed.table.write_csv_file(&output_path)?;

    Ok(FileReport {
        input_name,
        output_path,
        rows: transformed.table.len(),
        columns: transformed.table.columns().len(),
        dropped_column: transformed.dropped_column,
        truncated_cells: transformed.truncated_cells,
        skipped_lines: loaded.skipped,
    })
}

/// Flatten records, snake_case the columns, drop the configured column
/// and truncate overlong strings.
pub fn transform_records(records: &[Value], config: &FlattenConfig) -> Result<Transformed> {
    let mut table = flatten_records(records)?;
    table.rename_columns(to_snake_case);
    let dropped_column = table.drop_column(&config.column_to_drop);
    let truncated_cells = table.truncate_strings(config.max_field_length);

    Ok(Transformed {
        table,
        dropped_column,
        truncated_cells,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> FlattenConfig {
        FlattenConfig::default()
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("users.json"), "users.csv");
        assert_eq!(output_file_name("brands.json.json"), "brands.json.csv");
    }

    #[test]
    fn test_transform_normalizes_columns() {
        let records = vec![json!({"UserID": "abc", "PointsEarned": 12.5})];
        let out = transform_records(&records, &config()).unwrap();
        assert_eq!(out.table.columns(), ["user_id", "points_earned"]);
        assert_eq!(out.table.cell(0, "user_id"), Some(&json!("abc")));
        assert_eq!(out.table.cell(0, "points_earned"), Some(&json!(12.5)));
        assert!(!out.dropped_column);
    }

    #[test]
    fn test_transform_drops_item_list() {
        let records = vec![
            json!({"_id": {"$oid": "r1"}, "rewardsReceiptItemList": [{"barcode": "1"}]}),
            json!({"_id": {"$oid": "r2"}}),
        ];
        let out = transform_records(&records, &config()).unwrap();
        assert!(out.dropped_column);
        assert_eq!(out.table.columns(), ["id_oid"]);
        assert_eq!(out.table.len(), 2);
    }

    #[test]
    fn test_nested_item_list_is_not_dropped() {
        // Only the exact normalized name is removed
        let records = vec![json!({"receipt": {"rewardsReceiptItemList": [1]}})];
        let out = transform_records(&records, &config()).unwrap();
        assert!(!out.dropped_column);
        assert_eq!(out.table.columns(), ["receipt_rewards_receipt_item_list"]);
    }

    #[test]
    fn test_transform_truncates_long_strings() {
        let mut cfg = config();
        cfg.max_field_length = 4;
        let records = vec![json!({"note": "abcdefgh", "count": 123456789, "tags": ["abcdefgh"]})];
        let out = transform_records(&records, &cfg).unwrap();
        assert_eq!(out.truncated_cells, 1);
        assert_eq!(out.table.cell(0, "note"), Some(&json!("abcd")));
        assert_eq!(out.table.cell(0, "count"), Some(&json!(123456789)));
        assert_eq!(out.table.cell(0, "tags"), Some(&json!(["abcdefgh"])));
    }
}
