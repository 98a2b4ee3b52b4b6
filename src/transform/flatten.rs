//! Flatten nested JSON-valued cells into flat, underscore-joined keys.
//!
//! Two entry points cover the two shapes nested data arrives in:
//!
//! - [`flatten_cell`] - a single cell whose raw string value is expected to
//!   hold a JSON object (the `PROPERTIES`/`TAGS` convention)
//! - [`flatten_record`] - a whole record whose values may be real JSON
//!   objects (what a nested JSON-array upload produces)
//!
//! Both fail soft: a cell that is neither a JSON object nor a `key: value`
//! pair survives verbatim under its original field name. Arrays are opaque
//! scalars and are never destructured.

use serde_json::{Map, Value};

use crate::models::Record;

/// Recursively flatten a JSON object into a single-level record.
///
/// Keys are joined with `_`: a value at `a.b.c` lands under `prefix_a_b_c`
/// (or `a_b_c` with an empty prefix). Scalar and array values are stored
/// directly; only object values recurse. On key collision the later, deeper
/// key wins.
pub fn flatten_object(obj: &Map<String, Value>, prefix: &str) -> Record {
    let mut flat = Record::new();
    for (key, value) in obj {
        let new_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}_{}", prefix, key)
        };
        match value {
            Value::Object(inner) => {
                for (k, v) in flatten_object(inner, &new_key) {
                    flat.insert(k, v);
                }
            }
            other => {
                flat.insert(new_key, other.clone());
            }
        }
    }
    flat
}

/// Flatten one raw cell taken from the column named `field`.
///
/// The raw string is parsed as JSON; an object result is flattened with
/// `field` as the key prefix. Anything else falls back to a single
/// `key: value` pair split on the first `:`. If that fails too, the raw
/// value is preserved as-is under `field` - this function never errors.
pub fn flatten_cell(field: &str, raw: &str) -> Record {
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) {
        return flatten_object(&obj, field);
    }

    if let Some((key, value)) = raw.split_once(':') {
        let key = key.trim();
        // An empty key would produce a dangling "FIELD_" column; treat it as
        // unparseable instead.
        if !key.is_empty() {
            let new_key = if field.is_empty() {
                key.to_string()
            } else {
                format!("{}_{}", field, key)
            };
            let mut flat = Record::new();
            flat.insert(new_key, Value::String(value.trim().to_string()));
            return flat;
        }
    }

    let mut flat = Record::new();
    flat.insert(field.to_string(), Value::String(raw.to_string()));
    flat
}

/// Flatten a whole record: real object values are destructured under their
/// field name, everything else (scalars, arrays, object-shaped *strings*)
/// passes through untouched.
///
/// A record with no object values comes back unchanged, so the operation is
/// idempotent.
pub fn flatten_record(record: &Record) -> Record {
    let mut flat = Record::new();
    for (key, value) in record {
        match value {
            Value::Object(inner) => {
                for (k, v) in flatten_object(inner, key) {
                    flat.insert(k, v);
                }
            }
            other => {
                flat.insert(key.clone(), other.clone());
            }
        }
    }
    flat
}

/// Drop flattened keys that start with any of the ignored prefixes.
pub fn strip_ignored(flat: Record, ignored: &[String]) -> Record {
    if ignored.is_empty() {
        return flat;
    }
    flat.into_iter()
        .filter(|(key, _)| !ignored.iter().any(|prefix| key.starts_with(prefix.as_str())))
        .collect()
}

/// Union of two records: every field of `additions` is inserted into a copy
/// of `base`, overwriting on collision (later keys win).
pub fn merge(base: &Record, additions: &Record) -> Record {
    let mut merged = base.clone();
    for (key, value) in additions {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_flatten_cell_object() {
        let flat = flatten_cell("PROPERTIES", r#"{"color":"red","size":"M"}"#);
        assert_eq!(flat["PROPERTIES_color"], "red");
        assert_eq!(flat["PROPERTIES_size"], "M");
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn test_flatten_cell_nested_object() {
        let flat = flatten_cell("TAGS", r#"{"geo":{"lat":1,"lon":2},"env":"prod"}"#);
        assert_eq!(flat["TAGS_geo_lat"], 1);
        assert_eq!(flat["TAGS_geo_lon"], 2);
        assert_eq!(flat["TAGS_env"], "prod");
    }

    #[test]
    fn test_flatten_cell_array_is_opaque() {
        let flat = flatten_cell("PROPERTIES", r#"{"sizes":["S","M"],"color":"red"}"#);
        assert_eq!(flat["PROPERTIES_sizes"], json!(["S", "M"]));
        assert_eq!(flat["PROPERTIES_color"], "red");
    }

    #[test]
    fn test_flatten_cell_key_value_fallback() {
        let flat = flatten_cell("PROPERTIES", "color : red");
        assert_eq!(flat["PROPERTIES_color"], "red");
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn test_flatten_cell_preserves_unparseable() {
        let flat = flatten_cell("PROPERTIES", "just some text");
        assert_eq!(flat["PROPERTIES"], "just some text");
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn test_flatten_cell_empty_key_preserved() {
        let flat = flatten_cell("PROPERTIES", ": orphan value");
        assert_eq!(flat["PROPERTIES"], ": orphan value");
    }

    #[test]
    fn test_flatten_cell_scalar_json_preserved() {
        // "42" parses as JSON but is not an object; no colon either.
        let flat = flatten_cell("PROPERTIES", "42");
        assert_eq!(flat["PROPERTIES"], "42");
    }

    #[test]
    fn test_flatten_record_idempotent_on_flat() {
        let rec = record(json!({"id": "1", "name": "a", "tags": [1, 2]}));
        assert_eq!(flatten_record(&rec), rec);
    }

    #[test]
    fn test_flatten_record_destructures_objects() {
        let rec = record(json!({"id": "1", "meta": {"a": 1, "b": {"c": 2}}}));
        let flat = flatten_record(&rec);
        assert_eq!(flat["id"], "1");
        assert_eq!(flat["meta_a"], 1);
        assert_eq!(flat["meta_b_c"], 2);
        assert!(flat.get("meta").is_none());
    }

    #[test]
    fn test_flatten_record_leaves_object_shaped_strings() {
        let rec = record(json!({"PROPERTIES": "{\"color\":\"red\"}"}));
        assert_eq!(flatten_record(&rec), rec);
    }

    #[test]
    fn test_strip_ignored() {
        let flat = record(json!({"PROPERTIES_color": "red", "PROPERTIES_debug_x": 1, "id": "1"}));
        let kept = strip_ignored(flat, &["PROPERTIES_debug".to_string()]);
        assert_eq!(kept.len(), 2);
        assert!(kept.get("PROPERTIES_debug_x").is_none());
    }

    #[test]
    fn test_merge_later_wins() {
        let base = record(json!({"a": 1, "b": 2}));
        let additions = record(json!({"b": 20, "c": 3}));
        let merged = merge(&base, &additions);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 20);
        assert_eq!(merged["c"], 3);
    }

    #[test]
    fn test_flatten_cell_deterministic() {
        let raw = r#"{"b":1,"a":{"x":2}}"#;
        assert_eq!(flatten_cell("P", raw), flatten_cell("P", raw));
    }
}
