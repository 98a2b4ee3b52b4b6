//! Serialize the current view to delimited text or JSON.
//!
//! The exporter sees the already filtered and grouped rows; its own job is
//! projection (visible fields only, relabeled by the rename map, in
//! field-list order) and serialization. Delimited output goes through the
//! `csv` writer, which quotes values containing the delimiter, quotes or
//! line breaks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExportError, ExportResult};
use crate::models::{value_to_string, Record};

/// Output serialization formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Delimited text with a header row of display names.
    Delimited,
    /// Indented JSON array of flat objects.
    Json,
}

impl ExportFormat {
    /// File extension appended to the user-entered output name.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Delimited => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Options for serializing a view.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Field separator for delimited output.
    pub delimiter: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Delimited,
            delimiter: b',',
        }
    }
}

/// A serialized view ready for the host's file-save mechanism.
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub bytes: Vec<u8>,
    /// `<user-entered-name>.<ext>`; the name is free text, not sanitized.
    pub filename: String,
}

/// Project rows to their visible fields, relabeled by the rename map, in
/// field-list order. Fields missing from a row are omitted rather than
/// nulled, so a JSON export re-parses to exactly the rows it was given.
pub fn project(
    records: &[Record],
    field_list: &[String],
    hidden: &[String],
    renames: &HashMap<String, String>,
) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            let mut out = Record::new();
            for field in field_list {
                if hidden.contains(field) {
                    continue;
                }
                if let Some(value) = record.get(field) {
                    let display = renames.get(field).cloned().unwrap_or_else(|| field.clone());
                    out.insert(display, value.clone());
                }
            }
            out
        })
        .collect()
}

/// Serialize the given (filtered and grouped) rows.
pub fn export(
    records: &[Record],
    field_list: &[String],
    hidden: &[String],
    renames: &HashMap<String, String>,
    name: &str,
    options: &ExportOptions,
) -> ExportResult<ExportPayload> {
    let bytes = match options.format {
        ExportFormat::Delimited => {
            to_delimited(records, field_list, hidden, renames, options.delimiter)?
        }
        ExportFormat::Json => {
            let projected: Vec<Value> = project(records, field_list, hidden, renames)
                .into_iter()
                .map(Value::Object)
                .collect();
            serde_json::to_vec_pretty(&projected)?
        }
    };

    Ok(ExportPayload {
        bytes,
        filename: format!("{}.{}", name, options.format.extension()),
    })
}

fn to_delimited(
    records: &[Record],
    field_list: &[String],
    hidden: &[String],
    renames: &HashMap<String, String>,
    delimiter: u8,
) -> ExportResult<Vec<u8>> {
    let visible: Vec<&String> = field_list.iter().filter(|f| !hidden.contains(f)).collect();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(
        visible
            .iter()
            .map(|field| renames.get(*field).map(String::as_str).unwrap_or(field)),
    )?;
    for record in records {
        writer.write_record(visible.iter().map(|field| {
            record
                .get(*field)
                .map(value_to_string)
                .unwrap_or_default()
        }))?;
    }
    writer.flush()?;

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(std::io::Error::other(e.to_string())))
}
