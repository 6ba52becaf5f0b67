//! Chart row coercion.
//!
//! Normalizes arbitrary JSON into category/value rows. Total: any input
//! produces a (possibly empty) row list.

use serde_json::{Map, Value};
use tessera_core::{ChartAxes, ChartRow};

const CATEGORY_KEYS: &[&str] = &["x", "name", "month", "date"];
const VALUE_KEYS: &[&str] = &["y", "value", "count"];
const NESTED_KEYS: &[&str] = &["data", "items"];

/// Coerce `value` into chart rows. Configured axes are tried before the
/// conventional keys.
pub fn coerce_rows(value: &Value, axes: Option<&ChartAxes>) -> Vec<ChartRow> {
    let x_axis = axes.and_then(|a| a.x_axis.as_deref());
    let y_axis = axes.and_then(|a| a.y_axis.as_deref());

    records(value, x_axis, y_axis)
        .into_iter()
        .enumerate()
        .map(|(index, record)| to_row(index, record, x_axis, y_axis))
        .collect()
}

/// Flatten the input into the list of records to chart. A bare object
/// only counts as a record when it carries a category or value key.
fn records<'a>(value: &'a Value, x_axis: Option<&str>, y_axis: Option<&str>) -> Vec<&'a Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => {
            let nested = NESTED_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_array));
            match nested {
                Some(items) => items.iter().collect(),
                None if has_row_key(map, x_axis, y_axis) => vec![value],
                None => Vec::new(),
            }
        }
        scalar => vec![scalar],
    }
}

fn has_row_key(map: &Map<String, Value>, x_axis: Option<&str>, y_axis: Option<&str>) -> bool {
    lookup_order(x_axis, CATEGORY_KEYS)
        .into_iter()
        .chain(lookup_order(y_axis, VALUE_KEYS))
        .any(|key| map.contains_key(key))
}

fn to_row(index: usize, record: &Value, x_axis: Option<&str>, y_axis: Option<&str>) -> ChartRow {
    match record {
        Value::Object(fields) => ChartRow {
            category: category_of(fields, x_axis).unwrap_or_else(|| index.to_string()),
            value: value_of(fields, y_axis),
            fields: fields.clone(),
        },
        scalar => ChartRow {
            category: index.to_string(),
            value: number(scalar).unwrap_or(0.0),
            fields: Map::new(),
        },
    }
}

fn category_of(fields: &Map<String, Value>, x_axis: Option<&str>) -> Option<String> {
    lookup_order(x_axis, CATEGORY_KEYS)
        .into_iter()
        .find_map(|key| match fields.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        })
}

fn value_of(fields: &Map<String, Value>, y_axis: Option<&str>) -> f64 {
    lookup_order(y_axis, VALUE_KEYS)
        .into_iter()
        .find_map(|key| fields.get(key).filter(|v| !v.is_null()))
        .and_then(number)
        .unwrap_or(0.0)
}

fn lookup_order<'a>(preferred: Option<&'a str>, defaults: &[&'a str]) -> Vec<&'a str> {
    let mut keys = Vec::with_capacity(defaults.len() + 1);
    keys.extend(preferred);
    keys.extend_from_slice(defaults);
    keys
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}
