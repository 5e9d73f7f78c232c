//! Metrics for the conversion pipelines.
//!
//! Values go through the `metrics` facade. Nothing is exported unless the
//! embedding program installs a recorder, in which case these names show up
//! under the usual Prometheus conventions.

use std::fmt;

/// All metric names used in the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Generic flattener
    FlattenFilesConverted,
    FlattenFilesFailed,
    FlattenRowsWritten,
    FlattenLinesSkipped,
    FlattenCellsTruncated,
    FlattenFileDuration,

    // Receipt expander
    ReceiptsParsed,
    ReceiptsRowsWritten,
    ReceiptsLinesSkipped,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::FlattenFilesConverted => "seed_flatten_files_converted_total",
            MetricName::FlattenFilesFailed => "seed_flatten_files_failed_total",
            MetricName::FlattenRowsWritten => "seed_flatten_rows_written_total",
            MetricName::FlattenLinesSkipped => "seed_flatten_lines_skipped_total",
            MetricName::FlattenCellsTruncated => "seed_flatten_cells_truncated_total",
            MetricName::FlattenFileDuration => "seed_flatten_file_duration_seconds",

            MetricName::ReceiptsParsed => "seed_receipts_parsed_total",
            MetricName::ReceiptsRowsWritten => "seed_receipts_rows_written_total",
            MetricName::ReceiptsLinesSkipped => "seed_receipts_lines_skipped_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Generic flattener
// ============================================================================

pub mod flatten {
    use super::MetricName;

    pub fn file_converted(rows: usize, duration_secs: f64) {
        ::metrics::counter!(MetricName::FlattenFilesConverted.as_str()).increment(1);
        ::metrics::counter!(MetricName::FlattenRowsWritten.as_str()).increment(rows as u64);
        ::metrics::histogram!(MetricName::FlattenFileDuration.as_str()).record(duration_secs);
    }

    pub fn file_failed() {
        ::metrics::counter!(MetricName::FlattenFilesFailed.as_str()).increment(1);
    }

    pub fn lines_skipped(count: usize) {
        if count > 0 {
            ::metrics::counter!(MetricName::FlattenLinesSkipped.as_str()).increment(count as u64);
        }
    }

    pub fn cells_truncated(count: usize) {
        if count > 0 {
            ::metrics::counter!(MetricName::FlattenCellsTruncated.as_str()).increment(count as u64);
        }
    }
}

// ============================================================================
// Receipt expander
// ============================================================================

pub mod receipts {
    use super::MetricName;

    pub fn receipt_parsed() {
        ::metrics::counter!(MetricName::ReceiptsParsed.as_str()).increment(1);
    }

    pub fn rows_written(rows: usize) {
        ::metrics::counter!(MetricName::ReceiptsRowsWritten.as_str()).increment(rows as u64);
    }

    pub fn lines_skipped(count: usize) {
        if count > 0 {
            ::metrics::counter!(MetricName::ReceiptsLinesSkipped.as_str()).increment(count as u64);
        }
    }
}
