//! Reconcile one canonical field list across heterogeneously-shaped records.
//!
//! The field list starts from the union of top-level keys across all records
//! in first-appearance order. Each designated nested column is then replaced
//! by the flattened sub-schema of its "model" record - the single record
//! whose cell flattens to the most sub-keys - appended after the top-level
//! fields. Electing a model record instead of taking the first row keeps
//! sparse rows from truncating the visible schema.
//!
//! Columns whose value is empty in every record are reported separately so
//! the caller can pre-hide them.

use std::collections::{BTreeSet, HashSet};

use crate::models::{is_blank, value_to_string, Record};
use crate::transform::flatten::{flatten_cell, strip_ignored};

/// Output of [`reconcile`]: the canonical ordered field list and the set of
/// uniformly-empty columns.
#[derive(Debug, Clone, Default)]
pub struct ReconciledSchema {
    /// Ordered, unique field names spanning the dataset. Nested source
    /// columns do not appear; their flattened sub-keys do.
    pub field_list: Vec<String>,
    /// Fields whose value is null, blank or an empty array in every record
    /// (a missing key counts as empty).
    pub empty_fields: BTreeSet<String>,
}

/// Compute the canonical schema for a batch of records.
///
/// `nested_columns` are the columns to flatten (the `PROPERTIES`/`TAGS`
/// convention); `ignored` are flattened-key prefixes dropped from the
/// schema. Records themselves are not modified - merging flattened
/// sub-fields into rows is the caller's job, so nothing is dropped silently
/// here.
///
/// Because the baseline is the union of all records' keys (not the first
/// record's), column order can differ from the first record's own key order
/// when later records introduce new fields.
pub fn reconcile(
    records: &[Record],
    nested_columns: &[String],
    ignored: &[String],
) -> ReconciledSchema {
    let mut field_list: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    // Top-level baseline: union across records, first appearance wins.
    for record in records {
        for key in record.keys() {
            if nested_columns.iter().any(|c| c == key) {
                continue;
            }
            if seen.insert(key.clone()) {
                field_list.push(key.clone());
            }
        }
    }

    // Flatten each nested cell once; kept per record for the emptiness scan.
    let mut flattened: Vec<Record> = vec![Record::new(); records.len()];
    for col in nested_columns {
        let mut model_keys: Vec<String> = Vec::new();
        for (i, record) in records.iter().enumerate() {
            let Some(raw) = record.get(col) else { continue };
            if is_blank(raw) {
                continue;
            }
            let flat = strip_ignored(flatten_cell(col, &value_to_string(raw)), ignored);
            if flat.len() > model_keys.len() {
                model_keys = flat.keys().cloned().collect();
            }
            for (key, value) in flat {
                flattened[i].insert(key, value);
            }
        }
        for key in model_keys {
            if seen.insert(key.clone()) {
                field_list.push(key);
            }
        }
    }

    let mut empty_fields = BTreeSet::new();
    for field in &field_list {
        let all_blank = records.iter().enumerate().all(|(i, record)| {
            match flattened[i].get(field).or_else(|| record.get(field)) {
                Some(value) => is_blank(value),
                None => true,
            }
        });
        if all_blank {
            empty_fields.insert(field.clone());
        }
    }

    ReconciledSchema {
        field_list,
        empty_fields,
    }
}
