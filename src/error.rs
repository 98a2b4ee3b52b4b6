//! Error types for the Gridsift explorer engine.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`LoadError`] - dataset parsing errors (delimited text or JSON)
//! - [`ConfigError`] - view configuration document errors
//! - [`ExportError`] - view export errors
//! - [`ExplorerError`] - top-level engine errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Dataset Loading Errors
// =============================================================================

/// Errors while loading a dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read input.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The file extension maps to no supported format.
    #[error("Unsupported file type: '{0}' (expected .csv, .tsv, .txt or .json)")]
    UnsupportedExtension(String),

    /// Malformed delimited input.
    #[error("Invalid delimited input: {0}")]
    Delimited(#[from] csv::Error),

    /// Malformed JSON input.
    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON input was valid but not an array of objects.
    #[error("JSON input must be an array of objects, got {0}")]
    NotAnArray(&'static str),

    /// Input decoded to no header row.
    #[error("No header row found in delimited input")]
    NoHeaders,
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in the view configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON.
    #[error("Configuration is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The document violates the configuration schema.
    #[error("Invalid configuration: {}", .0.join("; "))]
    Schema(Vec<String>),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing the current view.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Delimited writer error.
    #[error("Delimited export failed: {0}")]
    Delimited(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to write the output file.
    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Explorer Errors (top-level)
// =============================================================================

/// Top-level engine errors.
///
/// This is the main error type returned by [`crate::session::Session`]
/// operations. It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Dataset loading error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// A row index outside the loaded dataset.
    #[error("Row {0} out of range ({1} rows loaded)")]
    RowOutOfRange(usize, usize),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for dataset loading.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for session operations.
pub type ExplorerResult<T> = Result<T, ExplorerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // LoadError -> ExplorerError
        let load_err = LoadError::UnsupportedExtension("xlsx".into());
        let explorer_err: ExplorerError = load_err.into();
        assert!(explorer_err.to_string().contains("xlsx"));

        // ConfigError -> ExplorerError
        let config_err = ConfigError::Schema(vec!["ignoredKeys must be an array".into()]);
        let explorer_err: ExplorerError = config_err.into();
        assert!(explorer_err.to_string().contains("ignoredKeys"));
    }

    #[test]
    fn test_schema_error_joins_violations() {
        let err = ConfigError::Schema(vec!["first".into(), "second".into()]);
        let msg = err.to_string();
        assert!(msg.contains("first; second"));
    }

    #[test]
    fn test_row_out_of_range_format() {
        let err = ExplorerError::RowOutOfRange(12, 5);
        let msg = err.to_string();
        assert!(msg.contains("Row 12"));
        assert!(msg.contains("5 rows"));
    }
}
