//! Run configuration.
//!
//! Handles loading, validating, and merging `combine.toml`. The file is
//! optional and lives in the source root; stock defaults fill in every key it
//! leaves out, and command-line flags override both.
//!
//! ```text
//! vault/
//! ├── combine.toml          # optional, overrides stock defaults
//! ├── Projects/
//! └── combined_output_folder/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_dir_name = "combined_output_folder"
//! tmp_dir_name = "_tmp_md_flat"
//! ignore = []                 # Folder names skipped at any depth
//! root_title = "Vault root"   # Folder heading for documents at the root
//!
//! [headings]
//! folder_level = 1
//! file_level = 2
//!
//! [convert]
//! program = "pandoc"
//! format = "rtf"              # rtf, docx or md
//! output_basename = "combined"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::convert::{ConvertFormat, ConvertSettings};
use crate::naming::is_plain_name;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the source root.
pub const CONFIG_FILE_NAME: &str = "combine.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `combine.toml`.
///
/// All fields have defaults. User files need only specify the values they want
/// to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CombineConfig {
    /// Output folder, created inside the source root.
    pub output_dir_name: String,
    /// Folder for the flat documents, created inside the output folder.
    pub tmp_dir_name: String,
    /// Folder names excluded at any depth, case-insensitively.
    pub ignore: Vec<String>,
    /// Folder heading used for documents directly in the root.
    pub root_title: String,
    pub headings: HeadingsConfig,
    pub convert: ConvertConfig,
}

impl Default for CombineConfig {
    fn default() -> Self {
        Self {
            output_dir_name: "combined_output_folder".to_string(),
            tmp_dir_name: "_tmp_md_flat".to_string(),
            ignore: Vec::new(),
            root_title: "Vault root".to_string(),
            headings: HeadingsConfig::default(),
            convert: ConvertConfig::default(),
        }
    }
}

impl CombineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_plain_name(&self.output_dir_name) {
            return Err(ConfigError::Validation(format!(
                "output_dir_name must be a single folder name, got '{}'",
                self.output_dir_name
            )));
        }
        if !is_plain_name(&self.tmp_dir_name) {
            return Err(ConfigError::Validation(format!(
                "tmp_dir_name must be a single folder name, got '{}'",
                self.tmp_dir_name
            )));
        }
        if self.convert.program.trim().is_empty() {
            return Err(ConfigError::Validation(
                "convert.program must not be empty".into(),
            ));
        }
        if !is_plain_name(&self.convert.output_basename) {
            return Err(ConfigError::Validation(format!(
                "convert.output_basename must be a single file name, got '{}'",
                self.convert.output_basename
            )));
        }
        Ok(())
    }

    /// Converter settings for the `build` command.
    pub fn convert_settings(&self) -> ConvertSettings {
        ConvertSettings {
            program: self.convert.program.clone(),
            format: self.convert.format,
            output_basename: self.convert.output_basename.clone(),
        }
    }
}

/// Heading depths. Values outside `1..=6` are clamped when used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeadingsConfig {
    pub folder_level: i64,
    pub file_level: i64,
}

impl Default for HeadingsConfig {
    fn default() -> Self {
        Self {
            folder_level: 1,
            file_level: 2,
        }
    }
}

/// External converter used by `build`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    pub program: String,
    pub format: ConvertFormat,
    pub output_basename: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        let settings = ConvertSettings::default();
        Self {
            program: settings.program,
            format: settings.format,
            output_basename: settings.output_basename,
        }
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer that user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(CombineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `combine.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CombineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CombineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `combine.toml` in the given source root.
pub fn load_config(root: &Path) -> Result<CombineConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `combine.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# combine-md configuration
# ========================
# Place this file in the root of the folder you flatten, as combine.toml.
# All settings are optional. Values shown below are the defaults.
# Command-line flags override anything set here.
# Unknown keys will cause an error.

# Output folder, created inside the source root. It is always excluded from
# scanning and is deleted before each run unless --keep-output is given.
output_dir_name = "combined_output_folder"

# Folder for the numbered markdown documents, inside the output folder.
tmp_dir_name = "_tmp_md_flat"

# Folder names to skip, at any depth, compared case-insensitively.
# Example: ignore = ["Archive", "Templates"]
ignore = []

# Folder heading for documents that sit directly in the source root.
root_title = "Vault root"

# ---------------------------------------------------------------------------
# Headings
# ---------------------------------------------------------------------------
[headings]
# Markdown heading depth (1-6) for the folder heading. Written once per run of
# consecutive documents from the same folder.
folder_level = 1

# Heading depth (1-6) for each document's own title.
file_level = 2

# ---------------------------------------------------------------------------
# Conversion (build command)
# ---------------------------------------------------------------------------
[convert]
# Converter executable. Called as: <program> -s <documents...> -o <output>
program = "pandoc"

# Output format: "rtf", "docx" or "md".
format = "rtf"

# Name of the produced file, without extension.
output_basename = "combined"
"##
}
