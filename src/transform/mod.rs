//! Transformation module.
//!
//! This module holds the data transformation pipeline:
//! - Flatten: nested JSON-valued cells to underscore-joined flat keys
//! - Schema: reconcile one canonical field list across heterogeneous rows
//! - Filter: per-field search and exact-match criteria
//! - Group: stable partition by group key with secondary sort

pub mod filter;
pub mod flatten;
pub mod group;
pub mod schema;

pub use filter::{apply_filters, distinct_values, resolve_criterion, FilterState, MATCH_ALL};
pub use flatten::{flatten_cell, flatten_object, flatten_record, merge, strip_ignored};
pub use group::{group_and_sort, group_key};
pub use schema::{reconcile, ReconciledSchema};
