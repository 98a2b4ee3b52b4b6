//! User-controlled view overlay: renames, hidden columns, group-by set.
//!
//! Pure data plus small mutation operations - no I/O and no derived-state
//! recomputation here. The overlay is the single source of truth the
//! filter, group and export stages read through.
//!
//! Policy: a rename survives visibility toggles. Only restoring a snapshot
//! (the "reset" operation) brings the default label back.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{FieldDescriptor, DISPLAY_NAME_MAX};
use crate::transform::filter::FilterState;

/// Rename map, hidden set and group-by set for the loaded dataset.
///
/// `hidden` and `group_by` are kept as vectors: both are small, and
/// group-by activation order decides which field drives the secondary sort.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewState {
    /// Display-name overrides keyed by original field name.
    pub renames: HashMap<String, String>,
    /// Hidden columns, in the order they were hidden.
    pub hidden: Vec<String>,
    /// Group-by columns, in activation order.
    pub group_by: Vec<String>,
}

/// Captured view + filter state, replayed by the "reset" operation to
/// return to the moment right after the last file load. The group-by set
/// is deliberately not part of it: grouping survives a reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewSnapshot {
    pub renames: HashMap<String, String>,
    pub hidden: Vec<String>,
    pub filter: FilterState,
}

impl ViewState {
    /// Flip a column between hidden and visible. The rename entry, if any,
    /// is untouched.
    pub fn toggle_visibility(&mut self, field: &str) {
        if let Some(pos) = self.hidden.iter().position(|f| f == field) {
            self.hidden.remove(pos);
        } else {
            self.hidden.push(field.to_string());
        }
    }

    /// Hide a column unconditionally (used for pre-hiding empty or
    /// configured columns at load time).
    pub fn hide(&mut self, field: &str) {
        if !self.is_hidden(field) {
            self.hidden.push(field.to_string());
        }
    }

    pub fn is_hidden(&self, field: &str) -> bool {
        self.hidden.iter().any(|f| f == field)
    }

    /// Set a column's display name. Names longer than
    /// [`DISPLAY_NAME_MAX`] characters are truncated, not rejected;
    /// renaming a column back to its original name removes the override.
    pub fn rename(&mut self, field: &str, display_name: &str) {
        let capped: String = display_name.chars().take(DISPLAY_NAME_MAX).collect();
        if capped == field {
            self.renames.remove(field);
        } else {
            self.renames.insert(field.to_string(), capped);
        }
    }

    /// Current label of a column: the rename if present, the original name
    /// otherwise.
    pub fn display_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.renames.get(field).map(String::as_str).unwrap_or(field)
    }

    /// Flip a column's membership in the group-by set. Activation order is
    /// preserved for the fields that remain.
    pub fn toggle_group_by(&mut self, field: &str) {
        if let Some(pos) = self.group_by.iter().position(|f| f == field) {
            self.group_by.remove(pos);
        } else {
            self.group_by.push(field.to_string());
        }
    }

    pub fn is_group_by(&self, field: &str) -> bool {
        self.group_by.iter().any(|f| f == field)
    }

    /// Project the field list through this overlay into grid-ready column
    /// descriptors.
    pub fn descriptors(&self, field_list: &[String]) -> Vec<FieldDescriptor> {
        field_list
            .iter()
            .map(|field| FieldDescriptor {
                original_name: field.clone(),
                display_name: self.display_name(field).to_string(),
                hidden: self.is_hidden(field),
                is_group_by: self.is_group_by(field),
            })
            .collect()
    }

    /// Capture the resettable slice of state (renames, hidden set, filter
    /// inputs).
    pub fn snapshot(&self, filter: &FilterState) -> ViewSnapshot {
        ViewSnapshot {
            renames: self.renames.clone(),
            hidden: self.hidden.clone(),
            filter: filter.clone(),
        }
    }

    /// Replay a snapshot, returning the filter state it carried. The
    /// group-by set is left as-is.
    pub fn restore(&mut self, snapshot: &ViewSnapshot) -> FilterState {
        self.renames = snapshot.renames.clone();
        self.hidden = snapshot.hidden.clone();
        snapshot.filter.clone()
    }
}
