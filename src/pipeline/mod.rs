//! The two conversion pipelines. They share support code but never data:
//! `flatten` turns every JSON export into its own CSV, `receipts` expands
//! the receipts export into one row per purchased item.

pub mod flatten;
pub mod receipts;

pub use flatten::{FileFailure, FileReport, FlattenSummary};
pub use receipts::ReceiptSummary;
