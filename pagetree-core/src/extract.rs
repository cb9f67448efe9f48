//! Value extraction from JSON payloads.
//!
//! Key paths are dotted: `user.name`, `items.0.id`, `items.-1`, `items.*.id`.
//! A `*` segment maps the rest of the path over every element of a list (or
//! every value of an object) and yields a list. An empty path or a lone `*`
//! selects the whole payload.
//!
//! Modifiers follow the path after a pipe and are applied left to right:
//!
//! - `|json` decodes a string holding JSON
//! - `|length` replaces a list, object or string with its length
//! - any other text is treated as a further key path, so
//!   `body|json|user.id` reads into an embedded JSON document
//!
//! Lookups never fail loudly. A path that does not resolve yields `None`.

use serde_json::Value;

/// Resolves `key_path` against `data`.
///
/// Returns the label of the matched key (the path without modifiers) and
/// the value, or `None` when nothing matched. With `dump` set, the value is
/// rendered as a pretty multi-line preview string.
pub fn extract_value(data: &Value, key_path: &str, dump: bool) -> (String, Option<Value>) {
    let mut steps = key_path.split('|').map(str::trim);
    let path = steps.next().unwrap_or_default();
    let label = if path.is_empty() { "*" } else { path }.to_string();

    let mut value = resolve_path(data, path);
    for modifier in steps {
        value = value.and_then(|v| apply_modifier(&v, modifier));
    }

    let value = value.filter(|v| !v.is_null());
    if dump {
        return (label, value.map(|v| Value::String(dump_value(&v))));
    }
    (label, value)
}

/// Projects a payload onto a list of column key paths.
///
/// Each cell is rendered with [`to_cell`]; unresolved columns are empty.
pub fn project_columns(data: &Value, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|column| {
            extract_value(data, column, false)
                .1
                .map(|v| to_cell(&v))
                .unwrap_or_default()
        })
        .collect()
}

/// Splits a column list typed by a user (one per line or comma separated).
pub fn parse_columns(text: &str) -> Vec<String> {
    text.split(['\n', ','])
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Renders a value as a single table cell.
///
/// Lists of scalars are joined with `;`, other containers are written as
/// compact JSON.
pub fn to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) if items.iter().all(is_scalar) => items
            .iter()
            .map(to_cell)
            .collect::<Vec<_>>()
            .join(";"),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn dump_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn resolve_path(data: &Value, path: &str) -> Option<Value> {
    if path.is_empty() || path == "*" {
        return Some(data.clone());
    }
    let segments: Vec<&str> = path
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    resolve(data, &segments)
}

fn resolve(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    if *head == "*" {
        let matches = match value {
            Value::Array(items) => items.iter().filter_map(|v| resolve(v, rest)).collect(),
            Value::Object(map) => map.values().filter_map(|v| resolve(v, rest)).collect(),
            _ => return None,
        };
        return Some(Value::Array(matches));
    }

    let next = match value {
        Value::Object(map) => map.get(*head),
        Value::Array(items) => head.parse::<i64>().ok().and_then(|i| index(items, i)),
        _ => None,
    }?;
    resolve(next, rest)
}

fn index(items: &[Value], i: i64) -> Option<&Value> {
    let len = i64::try_from(items.len()).ok()?;
    let i = if i < 0 { len + i } else { i };
    usize::try_from(i).ok().and_then(|i| items.get(i))
}

fn apply_modifier(value: &Value, modifier: &str) -> Option<Value> {
    match modifier {
        "" => Some(value.clone()),
        "json" => match value {
            Value::String(s) => serde_json::from_str(s).ok(),
            other => Some(other.clone()),
        },
        "length" => {
            let len = match value {
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                Value::String(s) => s.chars().count(),
                _ => return None,
            };
            Some(Value::from(len))
        }
        path => resolve_path(value, path),
    }
}

// ============================================================================
// Tests
// ============================================================================
