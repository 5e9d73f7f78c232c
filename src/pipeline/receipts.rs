use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::{error, info, instrument};

use crate::config::ReceiptConfig;
use crate::error::Result;
use crate::ingest::{self, SkippedLine};
use crate::observability::metrics;
use crate::receipt::{ExpandedRow, Receipt, BASE_COLUMNS, ITEM_COLUMNS};
use crate::table::Table;

/// Result of one expansion run
#[derive(Debug)]
pub struct ReceiptSummary {
    pub receipts: usize,
    pub rows: usize,
    /// Lines that were not valid JSON
    pub skipped: Vec<SkippedLine>,
    pub output_path: PathBuf,
}

/// Expand the receipts export into one CSV row per purchased item.
///
/// The input is read as NDJSON only. Lines that are not valid JSON are
/// reported and skipped. Any other failure (missing input, a receipt whose
/// fields cannot be read, an unwritable output) aborts the run before the
/// CSV is written.
#[instrument(skip(config), fields(input = %config.input_file.display()))]
pub fn run(config: &ReceiptConfig) -> Result<ReceiptSummary> {
    let file = File::open(&config.input_file)?;
    let loaded = ingest::read_ndjson(BufReader::new(file))?;

    for skipped in &loaded.skipped {
        println!(
            "Skipping invalid JSON line {}: {}",
            skipped.line_number, skipped.message
        );
    }
    metrics::receipts::lines_skipped(loaded.skipped.len());

    let mut rows: Vec<ExpandedRow> = Vec::new();
    for (value, line) in loaded.records.iter().zip(&loaded.record_lines) {
        let receipt = Receipt::from_value(value).map_err(|e| {
            error!(line, error = %e, "Unreadable receipt");
            e
        })?;
        metrics::receipts::receipt_parsed();
        rows.extend(receipt.expand());
    }
    let receipts = loaded.records.len();

    let table = build_table(&rows);
    table.write_csv_file(&config.output_file)?;
    metrics::receipts::rows_written(table.len());

    info!(receipts, rows = table.len(), "Receipt items written");
    println!(
        "✅ Expanded JSON data saved to: {}",
        config.output_file.display()
    );

    Ok(ReceiptSummary {
        receipts,
        rows: table.len(),
        skipped: loaded.skipped,
        output_path: config.output_file.clone(),
    })
}

/// Lay the rows out as a table. Item columns are only present when at
/// least one row carries an item.
pub fn build_table(rows: &[ExpandedRow]) -> Table {
    let with_items = rows.iter().any(|r| r.item.is_some());
    let mut columns: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
    if with_items {
        columns.extend(ITEM_COLUMNS.iter().map(|c| c.to_string()));
    }

    let mut table = Table::new(columns);
    for row in rows {
        table.push_row(row.cells(with_items));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn expand(values: &[serde_json::Value]) -> Vec<ExpandedRow> {
        values
            .iter()
            .flat_map(|v| Receipt::from_value(v).unwrap().expand())
            .collect()
    }

    #[test]
    fn test_table_without_items_has_base_columns_only() {
        let rows = expand(&[json!({"userId": "u1"}), json!({"userId": "u2"})]);
        let table = build_table(&rows);
        assert_eq!(table.columns().len(), BASE_COLUMNS.len());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_with_mixed_receipts() {
        let rows = expand(&[
            json!({"userId": "u1"}),
            json!({"userId": "u2", "rewardsReceiptItemList": [{"barcode": "1"}, {"barcode": "2"}]}),
        ]);
        let table = build_table(&rows);
        assert_eq!(table.columns().len(), BASE_COLUMNS.len() + ITEM_COLUMNS.len());
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(0, "barcode"), None);
        assert_eq!(table.cell(0, "user_id"), Some(&json!("u1")));
        assert_eq!(table.cell(2, "barcode"), Some(&json!("2")));
        assert_eq!(table.cell(2, "needs_fetch_review"), Some(&json!(false)));
    }
}
