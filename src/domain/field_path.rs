// src/domain/field_path.rs

use serde_json::{Map, Value};

/// Walks a dotted path through nested JSON objects.
///
/// Every segment is an object key, including numeric-looking ones (`"0"` never
/// indexes an array) and empty ones (`"a..b"` looks up the key `""`). Returns
/// `None` as soon as a segment is missing or the walk reaches a non-object.
pub fn resolve<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |node, segment| node.as_object()?.get(segment))
}

/// Like [`resolve`] but yields `default` for missing paths and for explicit
/// JSON `null` leaves.
pub fn resolve_or(record: &Value, path: &str, default: Value) -> Value {
    match resolve(record, path) {
        Some(Value::Null) | None => default,
        Some(v) => v.clone(),
    }
}

/// Writes `value` at `path`, creating intermediate objects as needed.
/// Non-object intermediates (including `null`) are replaced by objects.
pub fn set_path(record: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut node = record;

    while let Some(segment) = segments.next() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        // just ensured it's an object
        let Value::Object(map) = node else { return };

        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        node = map.entry(segment.to_string()).or_insert(Value::Null);
    }
}

/// Shown where a field has no value.
pub const EMPTY_VALUE: &str = "n/a";

/// Renders a resolved value for display in the diff table.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => EMPTY_VALUE.to_string(),
        Value::String(s) if s.is_empty() => EMPTY_VALUE.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
