//! One explorer session: a loaded dataset plus the user's view overlay.
//!
//! Every user-triggered action (load, toggle, filter edit, cell edit,
//! export) is an atomic transition on the [`Session`]: it computes a full
//! new state from current inputs and nothing in between is observable. The
//! derived grid (filtered then grouped rows) is memoized against a revision
//! counter that every transition bumps, so repeated reads between edits
//! don't re-run the engine.
//!
//! A new load builds a brand-new session; prior dataset and view state are
//! discarded wholesale, never merged.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ViewConfig;
use crate::error::{ExplorerError, ExplorerResult, LoadError};
use crate::export::{self, ExportOptions, ExportPayload};
use crate::models::{truncate_display, value_to_string, FieldDescriptor, Record};
use crate::parser::{self, ParsedInput};
use crate::transform::filter::{apply_filters, distinct_values, resolve_criterion, FilterState};
use crate::transform::flatten::{flatten_cell, merge, strip_ignored};
use crate::transform::group::group_and_sort;
use crate::transform::schema::reconcile;
use crate::view::{ViewSnapshot, ViewState};

fn default_nested_columns() -> Vec<String> {
    vec!["PROPERTIES".to_string(), "TAGS".to_string()]
}

/// Options for loading a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Columns whose raw value is flattened and merged into the row, with
    /// the source column removed.
    #[serde(default = "default_nested_columns")]
    pub nested_columns: Vec<String>,

    /// Drop rows that are identical after flattening (first occurrence
    /// kept).
    #[serde(default)]
    pub dedup: bool,

    /// View configuration applied at load time.
    #[serde(default)]
    pub config: ViewConfig,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            nested_columns: default_nested_columns(),
            dedup: false,
            config: ViewConfig::default(),
        }
    }
}

/// Detection metadata about the loaded input.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub encoding: String,
    pub delimiter: Option<char>,
    pub row_count: usize,
    pub column_count: usize,
}

/// The transformed view ready for display: visible column descriptors and
/// display-truncated cell text, row-aligned with the current filtered and
/// grouped sequence.
#[derive(Debug, Clone, Serialize)]
pub struct GridView {
    pub columns: Vec<FieldDescriptor>,
    pub rows: Vec<Vec<String>>,
}

/// A loaded dataset with its reconciled schema and live view state.
#[derive(Debug)]
pub struct Session {
    records: Vec<Record>,
    field_list: Vec<String>,
    empty_fields: BTreeSet<String>,
    info: DatasetInfo,
    view: ViewState,
    filter: FilterState,
    baseline: ViewSnapshot,
    revision: u64,
    derived: Option<(u64, Vec<Record>)>,
}

impl Session {
    /// Load a dataset from an in-memory upload. The file name decides the
    /// format; encoding and delimiter are auto-detected.
    pub fn load(name: &str, bytes: &[u8], options: LoadOptions) -> ExplorerResult<Self> {
        let parsed = parser::parse_named(name, bytes)?;
        Self::from_parsed(parsed, options)
    }

    /// Load a dataset from a file on disk.
    pub fn load_path(path: impl AsRef<Path>, options: LoadOptions) -> ExplorerResult<Self> {
        let parsed = parser::parse_path(path)?;
        Self::from_parsed(parsed, options)
    }

    fn from_parsed(parsed: ParsedInput, options: LoadOptions) -> ExplorerResult<Self> {
        let ignored = &options.config.ignored_keys;

        let mut records: Vec<Record> = parsed
            .records
            .into_iter()
            .map(|record| strip_ignored(record, ignored))
            .collect();

        // Schema first: the reconciler elects each nested column's model
        // record from the raw cells, before they are merged away.
        let schema = reconcile(&records, &options.nested_columns, ignored);

        for record in &mut records {
            for column in &options.nested_columns {
                let Some(raw) = record.get(column) else { continue };
                let flat = strip_ignored(flatten_cell(column, &value_to_string(raw)), ignored);
                // The flattener hands unparseable cells back under the
                // column's own name; those must survive the merge.
                if !flat.contains_key(column) {
                    record.remove(column);
                }
                *record = merge(record, &flat);
            }
        }

        if options.dedup {
            let before = records.len();
            let mut seen = HashSet::new();
            let mut unique = Vec::with_capacity(before);
            for record in records {
                let identity = serde_json::to_string(&record).map_err(LoadError::from)?;
                if seen.insert(identity) {
                    unique.push(record);
                }
            }
            if unique.len() < before {
                info!("dropped {} duplicate rows", before - unique.len());
            }
            records = unique;
        }

        let mut view = ViewState::default();
        for field in &schema.empty_fields {
            view.hide(field);
        }
        for field in &options.config.columns_to_uncheck {
            if schema.field_list.contains(field) {
                view.hide(field);
            }
        }

        let filter = FilterState::default();
        let baseline = view.snapshot(&filter);

        info!(
            "loaded {} rows, {} columns ({} empty)",
            records.len(),
            schema.field_list.len(),
            schema.empty_fields.len()
        );

        Ok(Self {
            info: DatasetInfo {
                encoding: parsed.encoding,
                delimiter: parsed.delimiter,
                row_count: records.len(),
                column_count: schema.field_list.len(),
            },
            records,
            field_list: schema.field_list,
            empty_fields: schema.empty_fields,
            view,
            filter,
            baseline,
            revision: 0,
            derived: None,
        })
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    /// The canonical ordered field list.
    pub fn field_list(&self) -> &[String] {
        &self.field_list
    }

    /// Fields that were uniformly empty at load time.
    pub fn empty_fields(&self) -> &BTreeSet<String> {
        &self.empty_fields
    }

    /// The loaded records, flattened and merged, in load order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Detection metadata for the loaded input.
    pub fn info(&self) -> &DatasetInfo {
        &self.info
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    /// Column descriptors for the full field list (hidden ones included,
    /// flagged).
    pub fn descriptors(&self) -> Vec<FieldDescriptor> {
        self.view.descriptors(&self.field_list)
    }

    /// Suggestion list for one column: its distinct values across the full
    /// dataset, narrowed by the column's current search term.
    pub fn suggestions(&self, field: &str) -> Vec<String> {
        let search = self.filter.search_terms.get(field).map(String::as_str);
        distinct_values(&self.records, field, search)
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Flip a column between hidden and visible.
    pub fn toggle_column(&mut self, field: &str) {
        self.view.toggle_visibility(field);
        self.touch();
    }

    /// Relabel a column. Any criterion filed under the old label is carried
    /// forward to the new one.
    pub fn rename_column(&mut self, field: &str, display_name: &str) {
        let old_display = self.view.display_name(field).to_string();
        self.view.rename(field, display_name);
        let new_display = self.view.display_name(field).to_string();
        self.filter.rekey_criterion(&old_display, &new_display);
        self.touch();
    }

    /// Flip a column's membership in the group-by set.
    pub fn toggle_group_by(&mut self, field: &str) {
        self.view.toggle_group_by(field);
        self.touch();
    }

    /// Record what the user typed into a column's filter box: the entry
    /// becomes both the column's search term and - resolved against the
    /// known distinct values - its exact-match criterion. An empty entry
    /// clears both.
    pub fn set_filter(&mut self, field: &str, entered: &str) {
        let display = self.view.display_name(field).to_string();
        if entered.is_empty() {
            self.filter.criteria.remove(&display);
            self.filter.set_search(field, "");
        } else {
            let options = distinct_values(&self.records, field, None);
            let resolved = resolve_criterion(entered, &options);
            self.filter.set_criterion(&display, &resolved);
            self.filter.set_search(field, entered);
        }
        self.touch();
    }

    /// Set only the search term for a column.
    pub fn set_search(&mut self, field: &str, term: &str) {
        self.filter.set_search(field, term);
        self.touch();
    }

    /// Set only the exact-match criterion for a column (loose-resolved
    /// against the known distinct values).
    pub fn set_criterion(&mut self, field: &str, entered: &str) {
        let display = self.view.display_name(field).to_string();
        let options = distinct_values(&self.records, field, None);
        self.filter
            .set_criterion(&display, &resolve_criterion(entered, &options));
        self.touch();
    }

    /// Overwrite one cell of a loaded record (row index into
    /// [`Session::records`] order).
    pub fn update_cell(&mut self, row: usize, field: &str, value: Value) -> ExplorerResult<()> {
        let count = self.records.len();
        let record = self
            .records
            .get_mut(row)
            .ok_or(ExplorerError::RowOutOfRange(row, count))?;
        record.insert(field.to_string(), value);
        self.touch();
        Ok(())
    }

    /// Return to the state captured right after load: renames, hidden
    /// columns, criteria and search terms are restored; grouping stands.
    pub fn reset(&mut self) {
        self.filter = self.view.restore(&self.baseline);
        self.touch();
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    // -------------------------------------------------------------------------
    // Derived views
    // -------------------------------------------------------------------------

    /// The current filtered and grouped row sequence. Memoized until the
    /// next transition.
    pub fn rows(&mut self) -> &[Record] {
        let stale = !matches!(&self.derived, Some((rev, _)) if *rev == self.revision);
        if stale {
            let filtered = apply_filters(
                &self.records,
                &self.field_list,
                &self.view.renames,
                &self.filter,
            );
            let grouped = group_and_sort(filtered, &self.view.group_by, &self.view.hidden);
            self.derived = Some((self.revision, grouped));
        }
        match &self.derived {
            Some((_, rows)) => rows,
            None => &[],
        }
    }

    /// Display payload: visible column descriptors plus display-truncated
    /// cell text for the current row sequence.
    pub fn grid(&mut self) -> GridView {
        let rows = self.rows().to_vec();
        let columns: Vec<FieldDescriptor> = self
            .descriptors()
            .into_iter()
            .filter(|d| !d.hidden)
            .collect();
        let cells = rows
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| {
                        let text = record
                            .get(&column.original_name)
                            .map(value_to_string)
                            .unwrap_or_default();
                        truncate_display(&text)
                    })
                    .collect()
            })
            .collect();
        GridView {
            columns,
            rows: cells,
        }
    }

    /// Project one row of the current sequence through the visibility and
    /// rename overlay, for a detail panel. Values are not truncated.
    pub fn row_detail(&mut self, row: usize) -> ExplorerResult<Vec<(String, String)>> {
        let count = self.rows().len();
        let record = self
            .rows()
            .get(row)
            .cloned()
            .ok_or(ExplorerError::RowOutOfRange(row, count))?;
        Ok(self
            .field_list
            .iter()
            .filter(|field| !self.view.is_hidden(field))
            .map(|field| {
                let value = record.get(field).map(value_to_string).unwrap_or_default();
                (self.view.display_name(field).to_string(), value)
            })
            .collect())
    }

    /// Serialize the current filtered and grouped view. `name` is the
    /// user-entered output name; the format's extension is appended.
    pub fn export(&mut self, name: &str, options: &ExportOptions) -> ExplorerResult<ExportPayload> {
        let rows = self.rows().to_vec();
        let payload = export::export(
            &rows,
            &self.field_list,
            &self.view.hidden,
            &self.view.renames,
            name,
            options,
        )?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormat;
    use serde_json::json;

    const NESTED_CSV: &str =
        "id,PROPERTIES\n1,\"{\"\"color\"\":\"\"red\"\"}\"\n2,\"{\"\"color\"\":\"\"blue\"\",\"\"size\"\":\"\"M\"\"}\"\n";

    fn load_csv(content: &str) -> Session {
        Session::load("data.csv", content.as_bytes(), LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_nested_column_scenario() {
        let mut session = load_csv(NESTED_CSV);
        assert_eq!(
            session.field_list(),
            &["id", "PROPERTIES_color", "PROPERTIES_size"]
        );
        let rows = session.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["PROPERTIES_color"], "red");
        assert!(rows[0].get("PROPERTIES_size").is_none());
        assert_eq!(rows[1]["PROPERTIES_size"], "M");
        assert!(rows[0].get("PROPERTIES").is_none());
    }

    #[test]
    fn test_unparseable_nested_cell_survives() {
        let mut session = load_csv("id,PROPERTIES\n1,not json at all\n");
        let rows = session.rows();
        assert_eq!(rows[0]["PROPERTIES"], "not json at all");
    }

    #[test]
    fn test_json_load() {
        let session = Session::load(
            "data.json",
            br#"[{"id": 1, "meta": {"a": "x"}}]"#,
            LoadOptions::default(),
        )
        .unwrap();
        assert_eq!(session.field_list(), &["id", "meta_a"]);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = Session::load("data.xlsx", b"whatever", LoadOptions::default());
        assert!(matches!(
            result,
            Err(ExplorerError::Load(LoadError::UnsupportedExtension(_)))
        ));
    }

    #[test]
    fn test_empty_fields_pre_hidden() {
        let session = load_csv("id,empty\n1,\n2,\n");
        assert!(session.view().is_hidden("empty"));
        assert!(!session.view().is_hidden("id"));
    }

    #[test]
    fn test_config_pre_hides_and_ignores() {
        let options = LoadOptions {
            config: ViewConfig {
                ignored_keys: vec!["PROPERTIES_internal".to_string()],
                columns_to_uncheck: vec!["id".to_string()],
            },
            ..LoadOptions::default()
        };
        let session = Session::load(
            "data.csv",
            b"id,PROPERTIES\n1,\"{\"\"color\"\":\"\"red\"\",\"\"internal_x\"\":1}\"\n",
            options,
        )
        .unwrap();
        assert!(session.view().is_hidden("id"));
        assert!(!session.field_list().contains(&"PROPERTIES_internal_x".to_string()));
    }

    #[test]
    fn test_dedup() {
        let options = LoadOptions {
            dedup: true,
            ..LoadOptions::default()
        };
        let session =
            Session::load("data.csv", b"a,b\n1,2\n1,2\n3,4\n", options).unwrap();
        assert_eq!(session.records().len(), 2);
    }

    #[test]
    fn test_filter_and_group_pipeline() {
        let mut session = load_csv("category,v\nB,1\nA,2\nB,3\nA,skip\n");
        session.set_search("v", "1");
        assert_eq!(session.rows().len(), 1);

        session.set_search("v", "");
        session.toggle_group_by("category");
        let rows = session.rows();
        let values: Vec<&str> = rows.iter().map(|r| r["v"].as_str().unwrap()).collect();
        assert_eq!(values, vec!["2", "skip", "1", "3"]);
    }

    #[test]
    fn test_rename_carries_criterion_forward() {
        let mut session = load_csv("city,v\nParis,1\nLyon,2\n");
        session.set_criterion("city", "Paris");
        assert_eq!(session.rows().len(), 1);

        session.rename_column("city", "Town");
        assert_eq!(session.filter().criteria["Town"], "Paris");
        assert_eq!(session.rows().len(), 1);
    }

    #[test]
    fn test_set_filter_loose_match_and_search() {
        let mut session = load_csv("city,v\nParis,1\nLyon,2\n");
        session.set_filter("city", "ly");
        assert_eq!(session.filter().criteria["city"], "Lyon");
        assert_eq!(session.filter().search_terms["city"], "ly");
        let rows = session.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["v"], "2");

        session.set_filter("city", "");
        assert!(session.filter().is_empty());
        assert_eq!(session.rows().len(), 2);
    }

    #[test]
    fn test_reset_restores_load_state_but_keeps_grouping() {
        let mut session = load_csv("id,empty,category\n1,,A\n2,,B\n");
        session.toggle_column("empty"); // un-hide the pre-hidden column
        session.rename_column("id", "ID");
        session.set_filter("category", "A");
        session.toggle_group_by("category");

        session.reset();
        assert!(session.view().is_hidden("empty"));
        assert_eq!(session.view().display_name("id"), "id");
        assert!(session.filter().is_empty());
        assert!(session.view().is_group_by("category"));
        assert_eq!(session.rows().len(), 2);
    }

    #[test]
    fn test_update_cell() {
        let mut session = load_csv("a\nold\n");
        session.update_cell(0, "a", json!("new")).unwrap();
        assert_eq!(session.rows()[0]["a"], "new");

        let err = session.update_cell(9, "a", json!("x")).unwrap_err();
        assert!(matches!(err, ExplorerError::RowOutOfRange(9, 1)));
    }

    #[test]
    fn test_grid_truncates_and_hides() {
        let long = "x".repeat(150);
        let content = format!("a,b\n{},short\n", long);
        let mut session = load_csv(&content);
        session.toggle_column("b");

        let grid = session.grid();
        assert_eq!(grid.columns.len(), 1);
        assert_eq!(grid.rows[0].len(), 1);
        assert!(grid.rows[0][0].ends_with("..."));
    }

    #[test]
    fn test_row_detail_uses_display_names() {
        let mut session = load_csv("id,city\n1,Paris\n");
        session.rename_column("city", "Town");
        let detail = session.row_detail(0).unwrap();
        assert_eq!(detail[0], ("id".to_string(), "1".to_string()));
        assert_eq!(detail[1], ("Town".to_string(), "Paris".to_string()));
    }

    #[test]
    fn test_export_reflects_current_view() {
        let mut session = load_csv("category,v\nB,1\nA,2\n");
        session.toggle_group_by("category");
        session.rename_column("v", "Value");

        let payload = session
            .export("filtered_data", &ExportOptions::default())
            .unwrap();
        assert_eq!(payload.filename, "filtered_data.csv");
        let text = String::from_utf8(payload.bytes).unwrap();
        assert_eq!(text, "category,Value\nA,2\nB,1\n");
    }

    #[test]
    fn test_export_json_round_trips_view() {
        let mut session = load_csv("a,b\n1,2\n3,4\n");
        let options = ExportOptions {
            format: ExportFormat::Json,
            delimiter: b',',
        };
        let payload = session.export("out", &options).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&payload.bytes).unwrap();
        let reparsed: Vec<Record> = parsed
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect();
        assert_eq!(reparsed, session.rows());
    }

    #[test]
    fn test_memoized_rows_refresh_on_transition() {
        let mut session = load_csv("a\n1\n2\n");
        assert_eq!(session.rows().len(), 2);
        assert_eq!(session.rows().len(), 2); // served from cache
        session.set_search("a", "1");
        assert_eq!(session.rows().len(), 1);
    }

    #[test]
    fn test_header_only_input_is_valid_and_empty() {
        let mut session = load_csv("a,b\n");
        assert!(session.field_list().is_empty());
        assert!(session.rows().is_empty());
        assert!(session.grid().columns.is_empty());
    }

    #[test]
    fn test_suggestions_follow_search_term() {
        let mut session = load_csv("city\nParis\nLyon\nPau\n");
        assert_eq!(session.suggestions("city"), vec!["Paris", "Lyon", "Pau"]);
        session.set_search("city", "pa");
        assert_eq!(session.suggestions("city"), vec!["Paris", "Pau"]);
    }
}
