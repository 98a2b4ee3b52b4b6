//! Stable grouping of filtered rows with a secondary sort.
//!
//! Rows are bucketed by their group key (the `-`-joined values of the
//! active group-by fields), buckets keep their first-seen order and each
//! bucket keeps its internal row order. The flattened sequence is then
//! sorted lexicographically on the first non-hidden group-by field; missing
//! and null values order as the empty string.

use std::collections::HashMap;

use crate::models::{value_to_string, Record};

/// Separator between group-by field values in a row's group key.
const GROUP_KEY_SEPARATOR: &str = "-";

/// Compute one row's group key: the `-`-joined stringified values of the
/// group-by fields. Missing fields contribute an empty segment.
pub fn group_key(record: &Record, group_by: &[String]) -> String {
    group_by
        .iter()
        .map(|field| record.get(field).map(value_to_string).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(GROUP_KEY_SEPARATOR)
}

/// Partition rows into groups and flatten them back into one sequence.
///
/// With no group-by fields this is the identity - the input vector is
/// returned untouched, not copied into a new order. Otherwise rows are
/// bucketed by group key (stable partition, buckets in first-seen order)
/// and the flattened sequence is sorted by the first group-by field that is
/// not hidden. When every group-by field is hidden the bucket order stands.
pub fn group_and_sort(records: Vec<Record>, group_by: &[String], hidden: &[String]) -> Vec<Record> {
    if group_by.is_empty() {
        return records;
    }

    let mut bucket_index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<Vec<Record>> = Vec::new();
    for record in records {
        let key = group_key(&record, group_by);
        match bucket_index.get(&key) {
            Some(&i) => buckets[i].push(record),
            None => {
                bucket_index.insert(key, buckets.len());
                buckets.push(vec![record]);
            }
        }
    }

    let mut flattened: Vec<Record> = buckets.into_iter().flatten().collect();

    if let Some(sort_field) = group_by.iter().find(|f| !hidden.contains(f)) {
        // Vec::sort_by is stable, so rows with equal keys keep bucket order.
        flattened.sort_by(|a, b| {
            let left = a.get(sort_field).map(value_to_string).unwrap_or_default();
            let right = b.get(sort_field).map(value_to_string).unwrap_or_default();
            left.cmp(&right)
        });
    }

    flattened
}
