//! Live-value helpers shared by the rule and compute engines.
//!
//! Live form data is a flat map from business key to `serde_json::Value`.
//! Sub-table values are arrays of row objects (`serde_json::Map`), which keeps
//! every encoding deterministic: both map types iterate in sorted key order.

use std::collections::BTreeMap;

use serde_json::Value;

/// Live form data: business key -> value.
pub type FormData = BTreeMap<String, Value>;

/// One sub-table row: child business key -> value.
pub type Row = serde_json::Map<String, Value>;

/// Null, empty string and empty array all count as empty; so does a missing
/// entry, which resolvers represent as `Value::Null`.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Numeric coercion: numbers pass through, numeric strings parse, everything
/// else is not a number.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Round half away from zero at `precision` decimal places.
pub fn round_half_away(value: f64, precision: u8) -> f64 {
    let factor = 10f64.powi(i32::from(precision));
    (value * factor).round() / factor
}

/// Resolve a dotted data path against the live data map.
///
/// `key` reads a top-level value. `table.child` extracts the child column
/// across all rows and yields it as an array. `table[1].child` reads a single
/// row. Returns `None` when the path does not resolve.
pub fn resolve_path(data: &FormData, path: &str) -> Option<Value> {
    let Some((head, child)) = path.split_once('.') else {
        return data.get(path).cloned();
    };
    let (table_key, row_index) = parse_indexed(head);
    let Some(Value::Array(rows)) = data.get(table_key) else {
        return None;
    };
    match row_index {
        Some(index) => rows
            .get(index)
            .and_then(Value::as_object)
            .and_then(|row| row.get(child))
            .cloned(),
        None => Some(Value::Array(
            rows.iter()
                .filter_map(Value::as_object)
                .filter_map(|row| row.get(child))
                .cloned()
                .collect(),
        )),
    }
}

/// Split a path segment like `items[2]` into `("items", Some(2))`.
fn parse_indexed(segment: &str) -> (&str, Option<usize>) {
    if let Some(open) = segment.find('[')
        && let Some(offset) = segment[open..].find(']')
        && let Ok(index) = segment[open + 1..open + offset].parse()
    {
        return (&segment[..open], Some(index));
    }
    (segment, None)
}
