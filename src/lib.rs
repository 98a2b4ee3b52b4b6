//! # Gridsift - tabular data exploration engine
//!
//! Gridsift loads a delimited or JSON dataset, flattens nested
//! object-valued columns, reconciles one canonical schema across
//! heterogeneous rows, and serves an interactive view: column
//! visibility/rename, per-column search and exact-match filters, grouping
//! with a secondary sort, row detail, and re-export to delimited text or
//! JSON.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐    ┌──────────┐    ┌───────────┐    ┌──────────────┐    ┌──────────┐
//! │ CSV/JSON  │───▶│  Parser  │───▶│  Flatten  │───▶│ Filter/Group │───▶│  Export  │
//! │  upload   │    │ (detect) │    │ reconcile │    │  (view state)│    │ CSV/JSON │
//! └───────────┘    └──────────┘    └───────────┘    └──────────────┘    └──────────┘
//! ```
//!
//! The UI is an external collaborator: the engine consumes parsed uploads
//! and exposes a [`session::GridView`] ready for display plus a
//! serializable export payload. All engine operations are synchronous pure
//! functions; [`session::Session`] is the stateful shell that sequences
//! them as atomic transitions.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridsift::{LoadOptions, Session};
//!
//! let csv = "id,PROPERTIES\n1,\"{\"\"color\"\":\"\"red\"\"}\"\n";
//! let mut session = Session::load("data.csv", csv.as_bytes(), LoadOptions::default()).unwrap();
//! assert_eq!(session.field_list(), &["id", "PROPERTIES_color"]);
//! session.set_filter("PROPERTIES_color", "red");
//! assert_eq!(session.rows().len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - hierarchical error types
//! - [`models`] - record and field-descriptor types, value helpers
//! - [`parser`] - delimited/JSON parsing with auto-detection
//! - [`transform`] - flatten, schema reconciliation, filter, group
//! - [`view`] - rename/hidden/group-by overlay
//! - [`export`] - view serialization
//! - [`config`] - persisted view configuration
//! - [`session`] - atomic-transition session over one loaded dataset

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// View overlay and serialization
pub mod config;
pub mod export;
pub mod view;

// Orchestration
pub mod session;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, ExplorerError, ExportError, LoadError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{FieldDescriptor, Record};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    detect_delimiter, detect_encoding, parse_delimited, parse_json, parse_named, parse_path,
    ParsedInput, SourceFormat,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    apply_filters, distinct_values, flatten_cell, flatten_record, group_and_sort, reconcile,
    FilterState, ReconciledSchema, MATCH_ALL,
};

// =============================================================================
// Re-exports - View, Export, Config
// =============================================================================

pub use config::ViewConfig;
pub use export::{ExportFormat, ExportOptions, ExportPayload};
pub use view::{ViewSnapshot, ViewState};

// =============================================================================
// Re-exports - Session
// =============================================================================

pub use session::{DatasetInfo, GridView, LoadOptions, Session};
