//! Domain models for the Gridsift explorer engine.
//!
//! The central type is [`Record`]: one flat row of scalar field values,
//! represented as an ordered JSON object (`serde_json`'s `preserve_order`
//! feature keeps iteration in insertion order, which is what makes the field
//! list a meaningful schema handle).
//!
//! Also here:
//!
//! - [`FieldDescriptor`] - per-column metadata ready for a grid header
//! - value helpers shared by the filter, group and export stages

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One flat row of scalar field values, in insertion order.
///
/// Records in one dataset need not share identical field sets; the reconciled
/// field list (see [`crate::transform::schema`]) is the authoritative schema.
pub type Record = Map<String, Value>;

/// Maximum length of a display name; longer renames are truncated, not
/// rejected.
pub const DISPLAY_NAME_MAX: usize = 100;

/// Cell values longer than this are shortened for grid display.
pub const DISPLAY_CELL_MAX: usize = 100;

// =============================================================================
// Field Descriptor
// =============================================================================

/// Per-column metadata projected for a grid header.
///
/// `display_name` defaults to `original_name`; renaming is independent of
/// hiding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    /// Field name as discovered in the dataset.
    pub original_name: String,
    /// Current label, after any rename.
    pub display_name: String,
    /// Whether the column is hidden in the grid.
    pub hidden: bool,
    /// Whether the column participates in grouping.
    pub is_group_by: bool,
}

// =============================================================================
// Value Helpers
// =============================================================================

/// Stringify a cell value for searching, exact matching and delimited export.
///
/// Scalars use their natural text form, null becomes the empty string, and
/// opaque arrays keep their JSON serialization.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Whether a cell value counts as empty for the uniformly-empty column scan:
/// null, an empty or whitespace-only string, or an empty array.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Whether a raw cell value is a candidate for flattening: a string shaped
/// like a JSON object or array.
pub fn looks_nested(value: &Value) -> bool {
    match value {
        Value::String(s) => {
            let trimmed = s.trim_start();
            trimmed.starts_with('{') || trimmed.starts_with('[')
        }
        _ => false,
    }
}

/// Shorten a cell value for grid display. Values at or under
/// [`DISPLAY_CELL_MAX`] characters pass through unchanged.
pub fn truncate_display(text: &str) -> String {
    if text.chars().count() <= DISPLAY_CELL_MAX {
        text.to_string()
    } else {
        let head: String = text.chars().take(DISPLAY_CELL_MAX).collect();
        format!("{}...", head)
    }
}
