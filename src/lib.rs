//! # seed_converter
//!
//! Turns JSON and NDJSON exports into flat CSV tables that can be loaded as
//! dbt seed files.
//!
//! Two pipelines live here:
//! - [`pipeline::flatten`] converts every `.json` file in a directory into a
//!   CSV with flattened, snake_cased columns.
//! - [`pipeline::receipts`] expands a receipts export into one row per
//!   purchased item.
//!
//! ```
//! use seed_converter::normalize::to_snake_case;
//!
//! assert_eq!(to_snake_case("rewardsReceiptItemList"), "rewards_receipt_item_list");
//! assert_eq!(to_snake_case("_id.$oid"), "id_oid");
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod flatten;
pub mod ingest;
pub mod logging;
pub mod normalize;
pub mod observability;
pub mod pipeline;
pub mod receipt;
pub mod table;

pub use config::{Config, FlattenConfig, ReceiptConfig};
pub use error::{ConvertError, Result};
pub use table::Table;
