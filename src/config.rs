use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{ConvertError, Result};

/// Settings for both pipelines. Every field falls back to the fixed
/// constants, so an empty file (or no file at all) reproduces the
/// default `raw_json/` -> `seeds/` layout.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub flatten: FlattenConfig,
    pub receipts: ReceiptConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_field_length: usize,
    pub column_to_drop: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(constants::RAW_JSON_DIR),
            output_dir: PathBuf::from(constants::SEEDS_DIR),
            max_field_length: constants::MAX_FIELD_LENGTH,
            column_to_drop: constants::COLUMN_TO_DROP.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from(constants::RECEIPTS_INPUT),
            output_file: PathBuf::from(constants::RECEIPT_ITEMS_OUTPUT),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConvertError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content)?;
        if config.flatten.max_field_length == 0 {
            return Err(ConvertError::Config(
                "flatten.max_field_length must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}
