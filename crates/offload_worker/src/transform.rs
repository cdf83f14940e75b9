use std::cmp::Ordering;

use serde_json::Value;

use crate::coerce::{format_number, to_number, to_text};
use crate::{decode_file_bytes, Dataset, ParseSource, Record, Request, WorkerError};

/// One stateless transformation per request.
pub trait Transform: Send + Sync {
    fn apply(&self, request: Request) -> Result<Dataset, WorkerError>;
}

/// The JSON parse / filter / sort pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonTransform;

impl Transform for JsonTransform {
    fn apply(&self, request: Request) -> Result<Dataset, WorkerError> {
        match request {
            Request::Parse { source } => match source {
                ParseSource::File(bytes) => {
                    let decoded = decode_file_bytes(&bytes)?;
                    parse_json_text(&decoded.text)
                }
                ParseSource::Content(text) => parse_json_text(&text),
                ParseSource::Payload(payload) => Ok(payload),
            },
            Request::Filter { payload, filter } => Ok(filter_records(payload, filter.as_deref())),
            Request::Sort { payload } => Ok(sort_records(payload)),
        }
    }
}

/// Parses file text into a dataset.
///
/// An array is the dataset itself; an object contributes its property values
/// in document order. Any other root is rejected.
pub fn parse_json_text(text: &str) -> Result<Dataset, WorkerError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| WorkerError::Decode(err.to_string()))?;
    match value {
        Value::Array(records) => Ok(records),
        Value::Object(map) => Ok(map.into_iter().map(|(_, record)| record).collect()),
        Value::Null => Err(WorkerError::UnsupportedShape("null")),
        Value::Bool(_) => Err(WorkerError::UnsupportedShape("a boolean")),
        Value::Number(_) => Err(WorkerError::UnsupportedShape("a number")),
        Value::String(_) => Err(WorkerError::UnsupportedShape("a string")),
    }
}

/// Deterministic text form of a whole record, used for search and as the
/// last-resort sort key.
///
/// Compact JSON in document key order. Integral floats render without a
/// fraction (`2.0` becomes `2`), the way a JavaScript host prints them.
pub fn canonical_text(record: &Record) -> String {
    let mut out = String::new();
    write_canonical(record, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Number(number) => out.push_str(&format_number(number)),
        Value::String(text) => push_json_string(text, out),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (index, (key, item)) in map.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                push_json_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Null | Value::Bool(_) => out.push_str(&value.to_string()),
    }
}

fn push_json_string(text: &str, out: &mut String) {
    // Serializing a str cannot fail.
    out.push_str(&serde_json::to_string(text).unwrap_or_default());
}

/// Keeps the records whose canonical text contains `needle`, ignoring case.
/// A missing or blank needle keeps everything.
pub fn filter_records(dataset: Dataset, needle: Option<&str>) -> Dataset {
    let needle = match needle {
        Some(text) if !text.trim().is_empty() => text.to_lowercase(),
        _ => return dataset,
    };
    dataset
        .into_iter()
        .filter(|record| canonical_text(record).to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Name,
    Canonical,
}

/// Picks the sort key from the first record only.
pub fn select_sort_key(first: Option<&Record>) -> SortKey {
    match first {
        Some(Value::Object(fields)) if fields.contains_key("id") => SortKey::Id,
        Some(Value::Object(fields)) if fields.contains_key("name") => SortKey::Name,
        _ => SortKey::Canonical,
    }
}

/// Stable ascending sort by the key chosen from the first record.
pub fn sort_records(dataset: Dataset) -> Dataset {
    match select_sort_key(dataset.first()) {
        SortKey::Id => sort_by_cached_key(dataset, |r| to_number(r.get("id")), compare_numbers),
        SortKey::Name => sort_by_cached_key(
            dataset,
            |r| to_text(r.get("name")).to_lowercase(),
            |a: &String, b: &String| a.cmp(b),
        ),
        SortKey::Canonical => sort_by_cached_key(
            dataset,
            |r| canonical_text(r).to_lowercase(),
            |a: &String, b: &String| a.cmp(b),
        ),
    }
}

fn sort_by_cached_key<K>(
    dataset: Dataset,
    key: impl Fn(&Record) -> K,
    compare: impl Fn(&K, &K) -> Ordering,
) -> Dataset {
    let mut keyed: Vec<(K, Record)> = dataset
        .into_iter()
        .map(|record| (key(&record), record))
        .collect();
    // `sort_by` is stable, so ties keep their input order.
    keyed.sort_by(|(a, _), (b, _)| compare(a, b));
    keyed.into_iter().map(|(_, record)| record).collect()
}

/// NaN sorts after every number and ties with itself.
fn compare_numbers(a: &f64, b: &f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
    }
}
