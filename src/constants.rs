/// Fixed locations and limits used when no configuration overrides them.
/// These match the layout a dbt project expects for its seed files.

// Generic flattener
pub const RAW_JSON_DIR: &str = "raw_json";
pub const SEEDS_DIR: &str = "seeds";
pub const JSON_EXTENSION: &str = ".json";
pub const CSV_EXTENSION: &str = ".csv";

/// Longest string (in characters) a dbt seed field may hold
pub const MAX_FIELD_LENGTH: usize = 131_072;

/// Column removed from every flattened table; the receipt expander owns it
pub const COLUMN_TO_DROP: &str = "rewards_receipt_item_list";

// Receipt expander
pub const RECEIPTS_INPUT: &str = "raw_json/receipts.json";
pub const RECEIPT_ITEMS_OUTPUT: &str = "seeds/receipt_items.csv";

/// Default tracing directive when RUST_LOG is unset
pub const DEFAULT_LOG_DIRECTIVE: &str = "seed_converter=info";
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "seed_converter.log";
