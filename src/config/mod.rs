//! View configuration import/export.
//!
//! A small persisted JSON document, validated against an embedded JSON
//! Schema (Draft 7) before use:
//!
//! ```json
//! {
//!   "ignoredKeys": ["PROPERTIES_internal"],
//!   "columnsToUncheck": ["id", "PROPERTIES_debug"]
//! }
//! ```
//!
//! `ignoredKeys` are flattened-key prefixes dropped entirely during
//! flattening; `columnsToUncheck` are field names pre-hidden on every
//! subsequent load. The document shape is a boundary contract - unknown
//! keys are rejected, not ignored.

use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};

static SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/view-config.json"))
        .expect("Invalid embedded schema")
});

/// Persisted view configuration applied at load time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    /// Flattened-key prefixes to drop entirely during flattening.
    #[serde(default)]
    pub ignored_keys: Vec<String>,
    /// Field names to pre-hide on every subsequent load.
    #[serde(default)]
    pub columns_to_uncheck: Vec<String>,
}

/// Validate a JSON document against the configuration schema.
///
/// Returns every violation, not just the first, so a rejection notice can
/// list them all.
pub fn validate(data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(&SCHEMA)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl ViewConfig {
    /// Parse and validate a configuration document.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let data: Value = serde_json::from_str(json)?;
        validate(&data).map_err(ConfigError::Schema)?;
        Ok(serde_json::from_value(data)?)
    }

    /// Serialize to an indented JSON document.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the configuration to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
