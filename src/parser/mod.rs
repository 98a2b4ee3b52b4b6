//! Input parsing with encoding and delimiter auto-detection.
//!
//! Two source formats are accepted: delimited text with a header row
//! (`.csv`, `.tsv`, `.txt`) and a JSON array of flat or nested objects
//! (`.json`). Anything else is rejected up front - an unsupported upload
//! must fail loudly, not load an empty grid.
//!
//! Delimited input goes through the `csv` reader (quoting, embedded line
//! breaks); the delimiter is sniffed from the header row and non-UTF-8
//! uploads are decoded via `chardet` + `encoding_rs`. JSON objects with
//! real nested values are flattened on the way in, so every parsed record
//! is flat.

use std::path::Path;

use log::debug;
use serde_json::Value;

use crate::error::{LoadError, LoadResult};
use crate::models::Record;
use crate::transform::flatten::flatten_record;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Delimited text with a header row.
    Delimited,
    /// JSON array of objects.
    Json,
}

/// Result of parsing with detection metadata.
#[derive(Debug, Clone)]
pub struct ParsedInput {
    /// Parsed flat records.
    pub records: Vec<Record>,
    /// Column headers in source order (for JSON: first record's keys).
    pub headers: Vec<String>,
    /// Detected or assumed encoding.
    pub encoding: String,
    /// Detected delimiter (delimited input only).
    pub delimiter: Option<char>,
    /// Which format the input was parsed as.
    pub format: SourceFormat,
}

/// Map a file name to its source format by extension.
pub fn format_for_name(name: &str) -> LoadResult<SourceFormat> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "csv" | "tsv" | "txt" => Ok(SourceFormat::Delimited),
        "json" => Ok(SourceFormat::Json),
        _ => Err(LoadError::UnsupportedExtension(extension)),
    }
}

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to a string using the given (normalized) encoding name.
/// Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Detect the delimiter by counting occurrences in the header row.
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");

    let candidates = [b',', b';', b'\t', b'|'];
    let mut best = b',';
    let mut best_count = 0;

    for &candidate in &candidates {
        let count = first_line.matches(candidate as char).count();
        if count > best_count {
            best_count = count;
            best = candidate;
        }
    }

    best
}

/// Parse delimited text with an explicit delimiter.
///
/// The first row declares the field names; every subsequent row becomes one
/// record of string values keyed by header. Empty lines are skipped, short
/// rows pad with empty strings, extra cells beyond the headers are dropped.
pub fn parse_delimited(content: &str, delimiter: u8) -> LoadResult<(Vec<Record>, Vec<String>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::NoHeaders);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        let mut record = Record::new();
        for (i, header) in headers.iter().enumerate() {
            let cell = row.get(i).unwrap_or("");
            record.insert(header.clone(), Value::String(cell.to_string()));
        }
        records.push(record);
    }

    Ok((records, headers))
}

/// Parse a JSON array of objects. Objects with real nested values are
/// flattened; an empty array is a valid empty dataset.
pub fn parse_json(content: &str) -> LoadResult<Vec<Record>> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(items) = value else {
        return Err(LoadError::NotAnArray(json_type(&value)));
    };

    let mut records = Vec::with_capacity(items.len());
    for item in &items {
        let Value::Object(obj) = item else {
            return Err(LoadError::NotAnArray(json_type(item)));
        };
        records.push(flatten_record(obj));
    }
    Ok(records)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array of non-objects",
        Value::Object(_) => "an object",
    }
}

/// Parse an in-memory upload, dispatching on the file name's extension and
/// auto-detecting encoding and delimiter.
pub fn parse_named(name: &str, bytes: &[u8]) -> LoadResult<ParsedInput> {
    let format = format_for_name(name)?;
    match format {
        SourceFormat::Delimited => {
            let encoding = detect_encoding(bytes);
            let content = decode_content(bytes, &encoding);
            let delimiter = detect_delimiter(&content);
            debug!(
                "parsed '{}': encoding {}, delimiter {:?}",
                name, encoding, delimiter as char
            );
            let (records, headers) = parse_delimited(&content, delimiter)?;
            Ok(ParsedInput {
                records,
                headers,
                encoding,
                delimiter: Some(delimiter as char),
                format,
            })
        }
        SourceFormat::Json => {
            let content = String::from_utf8_lossy(bytes).to_string();
            let records = parse_json(&content)?;
            let headers = records
                .first()
                .map(|r| r.keys().cloned().collect())
                .unwrap_or_default();
            Ok(ParsedInput {
                records,
                headers,
                encoding: "utf-8".to_string(),
                delimiter: None,
                format,
            })
        }
    }
}

/// Parse a file from disk (see [`parse_named`]).
pub fn parse_path(path: impl AsRef<Path>) -> LoadResult<ParsedInput> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    parse_named(name, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let (rows, headers) = parse_delimited("name,age\nAlice,30\nBob,25", b',').unwrap();
        assert_eq!(headers, vec!["name", "age"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Alice");
        assert_eq!(rows[1]["age"], "25");
    }

    #[test]
    fn test_quoted_values() {
        let (rows, _) = parse_delimited("name,value\nAlice,\"a, b\"\n", b',').unwrap();
        assert_eq!(rows[0]["value"], "a, b");
    }

    #[test]
    fn test_quoted_newline() {
        let (rows, _) = parse_delimited("name,value\nAlice,\"line1\nline2\"\n", b',').unwrap();
        assert_eq!(rows[0]["value"], "line1\nline2");
    }

    #[test]
    fn test_empty_lines_skipped() {
        let (rows, _) = parse_delimited("a,b\n1,2\n\n3,4\n", b',').unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_values_pad_empty() {
        let (rows, _) = parse_delimited("a,b,c\n1,,3\n1\n", b',').unwrap();
        assert_eq!(rows[0]["b"], "");
        assert_eq!(rows[1]["b"], "");
        assert_eq!(rows[1]["c"], "");
    }

    #[test]
    fn test_extra_columns_ignored() {
        let (rows, _) = parse_delimited("a,b\n1,2,3,4\n", b',').unwrap();
        assert_eq!(rows[0].len(), 2);
    }

    #[test]
    fn test_empty_input_has_no_headers() {
        assert!(matches!(
            parse_delimited("", b','),
            Err(LoadError::NoHeaders)
        ));
    }

    #[test]
    fn test_header_only_is_valid_empty_dataset() {
        let (rows, headers) = parse_delimited("a,b\n", b',').unwrap();
        assert!(rows.is_empty());
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
        assert_eq!(detect_delimiter("a|b|c"), b'|');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_format_for_name() {
        assert_eq!(format_for_name("data.csv").unwrap(), SourceFormat::Delimited);
        assert_eq!(format_for_name("data.TSV").unwrap(), SourceFormat::Delimited);
        assert_eq!(format_for_name("data.json").unwrap(), SourceFormat::Json);
        assert!(matches!(
            format_for_name("data.xlsx"),
            Err(LoadError::UnsupportedExtension(ext)) if ext == "xlsx"
        ));
        assert!(format_for_name("noextension").is_err());
    }

    #[test]
    fn test_parse_named_auto_detects() {
        let input = parse_named("data.csv", b"name;age\nAlice;30\n").unwrap();
        assert_eq!(input.delimiter, Some(';'));
        assert_eq!(input.records.len(), 1);
        assert_eq!(input.headers, vec!["name", "age"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Societe" with accented e's in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert!(decoded.starts_with("Soci"));
        assert_eq!(decoded.chars().count(), 7);
    }

    #[test]
    fn test_parse_json_flat() {
        let rows = parse_json(r#"[{"a": 1, "b": "x"}, {"a": 2}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["a"], 1);
    }

    #[test]
    fn test_parse_json_nested_objects_flattened() {
        let rows = parse_json(r#"[{"id": 1, "meta": {"a": {"b": 2}}}]"#).unwrap();
        assert_eq!(rows[0]["meta_a_b"], 2);
        assert!(rows[0].get("meta").is_none());
    }

    #[test]
    fn test_parse_json_empty_array() {
        assert!(parse_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_json_rejects_non_array() {
        assert!(matches!(
            parse_json(r#"{"a": 1}"#),
            Err(LoadError::NotAnArray("an object"))
        ));
        assert!(matches!(
            parse_json(r#"[1, 2]"#),
            Err(LoadError::NotAnArray("a number"))
        ));
    }

    #[test]
    fn test_parse_json_rejects_malformed() {
        assert!(matches!(parse_json("{oops"), Err(LoadError::Json(_))));
    }
}
