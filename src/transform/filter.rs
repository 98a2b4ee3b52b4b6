//! Per-field search and exact-match filtering.
//!
//! Two kinds of constraint combine per column:
//!
//! - **search terms** - case-insensitive substring match, keyed by the
//!   field's *original* name
//! - **filter criteria** - exact value match (or the [`MATCH_ALL`]
//!   sentinel), keyed by the field's *current display* name
//!
//! The split mirrors the entry widgets the engine serves: the search box is
//! bound to the column, the criterion dropdown to its visible label. The
//! engine translates through the rename map so both stay consistent when a
//! column is relabeled.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{value_to_string, Record};

/// Criterion value that disables exact matching for its field.
pub const MATCH_ALL: &str = "All";

/// A search term is capped to its last 100 characters when recorded,
/// mirroring the entry widget's length limit.
const SEARCH_TERM_MAX: usize = 100;

/// Live filter inputs: exact-match criteria and substring search terms.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterState {
    /// Exact-match targets keyed by display name. [`MATCH_ALL`] disables
    /// the criterion without removing it.
    pub criteria: HashMap<String, String>,
    /// Case-insensitive substrings keyed by original field name.
    pub search_terms: HashMap<String, String>,
}

impl FilterState {
    /// True when no constraint is active.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty() && self.search_terms.is_empty()
    }

    /// Record a search term for a field; an empty term clears it. Terms
    /// longer than the cap keep their tail (the part the user typed last).
    pub fn set_search(&mut self, field: &str, term: &str) {
        if term.is_empty() {
            self.search_terms.remove(field);
            return;
        }
        let capped: String = if term.chars().count() > SEARCH_TERM_MAX {
            term.chars()
                .skip(term.chars().count() - SEARCH_TERM_MAX)
                .collect()
        } else {
            term.to_string()
        };
        self.search_terms.insert(field.to_string(), capped);
    }

    /// Upsert an exact-match criterion under a display name.
    pub fn set_criterion(&mut self, display_name: &str, value: &str) {
        self.criteria
            .insert(display_name.to_string(), value.to_string());
    }

    /// Carry a criterion forward when its column is relabeled.
    pub fn rekey_criterion(&mut self, old_display: &str, new_display: &str) {
        if old_display == new_display {
            return;
        }
        if let Some(value) = self.criteria.remove(old_display) {
            self.criteria.insert(new_display.to_string(), value);
        }
    }

    /// Drop every constraint.
    pub fn clear(&mut self) {
        self.criteria.clear();
        self.search_terms.clear();
    }
}

/// Apply search terms and filter criteria to a record set.
///
/// A record is retained iff every field in `field_list` passes both its
/// search term (if any) and its criterion (if any). Missing fields
/// stringify to the empty string, so they fail any non-empty search and any
/// non-matching criterion without panicking.
///
/// With no active constraint the input is returned as-is (identity).
pub fn apply_filters(
    records: &[Record],
    field_list: &[String],
    renames: &HashMap<String, String>,
    state: &FilterState,
) -> Vec<Record> {
    if state.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| {
            field_list.iter().all(|field| {
                let display = renames.get(field).map(String::as_str).unwrap_or(field);
                let cell = record.get(field).map(value_to_string).unwrap_or_default();

                if let Some(term) = state.search_terms.get(field) {
                    if !cell.to_lowercase().contains(&term.to_lowercase()) {
                        return false;
                    }
                }
                if let Some(criterion) = state.criteria.get(display) {
                    if criterion != MATCH_ALL && cell != *criterion {
                        return false;
                    }
                }
                true
            })
        })
        .cloned()
        .collect()
}

/// Distinct values of one field across the full dataset, in first-appearance
/// order, optionally narrowed to those containing `search`
/// (case-insensitive). Feeds the per-column suggestion dropdown.
pub fn distinct_values(records: &[Record], field: &str, search: Option<&str>) -> Vec<String> {
    let needle = search
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase());

    let mut seen = std::collections::HashSet::new();
    let mut values = Vec::new();
    for record in records {
        let Some(value) = record.get(field) else { continue };
        let text = value_to_string(value);
        if let Some(ref needle) = needle {
            if !text.to_lowercase().contains(needle) {
                continue;
            }
        }
        if seen.insert(text.clone()) {
            values.push(text);
        }
    }
    values
}

/// Resolve a user-entered criterion against the known distinct values.
///
/// An exact match (or the [`MATCH_ALL`] sentinel) is kept as entered.
/// Otherwise the first known value starting with the entered text
/// (case-insensitive) is substituted; failing that, the literal text stands
/// and will simply match nothing.
pub fn resolve_criterion(entered: &str, options: &[String]) -> String {
    if entered == MATCH_ALL || options.iter().any(|o| o == entered) {
        return entered.to_string();
    }
    let lowered = entered.to_lowercase();
    options
        .iter()
        .find(|option| option.to_lowercase().starts_with(&lowered))
        .cloned()
        .unwrap_or_else(|| entered.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    fn rows() -> Vec<Record> {
        vec![
            record(json!({"name": "Alice", "city": "Paris"})),
            record(json!({"name": "Bob", "city": "Lyon"})),
            record(json!({"name": "Carol", "city": "Paris"})),
        ]
    }

    fn fields() -> Vec<String> {
        vec!["name".to_string(), "city".to_string()]
    }

    #[test]
    fn test_identity_on_empty_constraints() {
        let rows = rows();
        let out = apply_filters(&rows, &fields(), &HashMap::new(), &FilterState::default());
        assert_eq!(out, rows);
    }

    #[test]
    fn test_search_is_case_insensitive_substring() {
        let mut state = FilterState::default();
        state.set_search("name", "ali");
        let out = apply_filters(&rows(), &fields(), &HashMap::new(), &state);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "Alice");
    }

    #[test]
    fn test_criterion_exact_match() {
        let mut state = FilterState::default();
        state.set_criterion("city", "Paris");
        let out = apply_filters(&rows(), &fields(), &HashMap::new(), &state);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_match_all_sentinel() {
        let mut state = FilterState::default();
        state.set_criterion("city", MATCH_ALL);
        let out = apply_filters(&rows(), &fields(), &HashMap::new(), &state);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_criterion_keyed_by_display_name() {
        let mut renames = HashMap::new();
        renames.insert("city".to_string(), "Town".to_string());
        let mut state = FilterState::default();
        state.set_criterion("Town", "Lyon");
        let out = apply_filters(&rows(), &fields(), &renames, &state);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "Bob");
    }

    #[test]
    fn test_missing_field_fails_search() {
        let rows = vec![record(json!({"name": "Alice"})), record(json!({"other": 1}))];
        let mut state = FilterState::default();
        state.set_search("name", "a");
        let out = apply_filters(
            &rows,
            &["name".to_string(), "other".to_string()],
            &HashMap::new(),
            &state,
        );
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_number_criterion_matches_stringified() {
        let rows = vec![record(json!({"n": 42})), record(json!({"n": 7}))];
        let mut state = FilterState::default();
        state.set_criterion("n", "42");
        let out = apply_filters(&rows, &["n".to_string()], &HashMap::new(), &state);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_search_and_criterion_combine() {
        let mut state = FilterState::default();
        state.set_search("name", "o");
        state.set_criterion("city", "Paris");
        let out = apply_filters(&rows(), &fields(), &HashMap::new(), &state);
        // "o" matches Bob and Carol; Paris keeps only Carol.
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "Carol");
    }

    #[test]
    fn test_set_search_caps_to_tail() {
        let mut state = FilterState::default();
        let long = format!("{}{}", "x".repeat(150), "needle");
        state.set_search("name", &long);
        let stored = &state.search_terms["name"];
        assert_eq!(stored.chars().count(), 100);
        assert!(stored.ends_with("needle"));
    }

    #[test]
    fn test_set_search_empty_clears() {
        let mut state = FilterState::default();
        state.set_search("name", "a");
        state.set_search("name", "");
        assert!(state.search_terms.is_empty());
    }

    #[test]
    fn test_rekey_criterion() {
        let mut state = FilterState::default();
        state.set_criterion("city", "Paris");
        state.rekey_criterion("city", "Town");
        assert!(state.criteria.get("city").is_none());
        assert_eq!(state.criteria["Town"], "Paris");
    }

    #[test]
    fn test_distinct_values_order_and_dedup() {
        let values = distinct_values(&rows(), "city", None);
        assert_eq!(values, vec!["Paris", "Lyon"]);
    }

    #[test]
    fn test_distinct_values_narrowed_by_search() {
        let values = distinct_values(&rows(), "city", Some("par"));
        assert_eq!(values, vec!["Paris"]);
    }

    #[test]
    fn test_resolve_criterion_prefix_fallback() {
        let options = vec!["Paris".to_string(), "Lyon".to_string()];
        assert_eq!(resolve_criterion("ly", &options), "Lyon");
        assert_eq!(resolve_criterion("Paris", &options), "Paris");
        assert_eq!(resolve_criterion("Nantes", &options), "Nantes");
        assert_eq!(resolve_criterion(MATCH_ALL, &options), MATCH_ALL);
    }
}
