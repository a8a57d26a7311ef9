//! Aggregate computation over live form data.

use serde::Serialize;
use serde_json::{Value, json};

use formkit_model::{
    AggregateFn, Computation, FormData, as_number, is_empty_value, round_half_away,
};

pub const DEFAULT_PRECISION: u8 = 2;
pub const DEFAULT_SEPARATOR: &str = ",";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputeResult {
    pub value: Value,
    /// Rows (or direct values) the source yielded before filtering.
    pub source_count: usize,
    /// Rows that survived the filter; `None` for direct field sources.
    pub filtered_count: Option<usize>,
}

/// Run one computation against the live data. Total: malformed sources and
/// missing data reduce over an empty column rather than failing.
pub fn calculate(computation: &Computation, data: &FormData) -> ComputeResult {
    match computation.source.split_once('.') {
        Some((table, child)) => calculate_table(computation, data, table, child),
        None => calculate_direct(computation, data),
    }
}

fn calculate_direct(computation: &Computation, data: &FormData) -> ComputeResult {
    let column: Vec<Value> = data
        .get(&computation.source)
        .filter(|value| !value.is_null())
        .cloned()
        .into_iter()
        .collect();
    ComputeResult {
        value: reduce(computation, &column),
        source_count: column.len(),
        filtered_count: None,
    }
}

fn calculate_table(
    computation: &Computation,
    data: &FormData,
    table: &str,
    child: &str,
) -> ComputeResult {
    let rows: Vec<&serde_json::Map<String, Value>> = match data.get(table) {
        Some(Value::Array(rows)) => rows.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    };
    let source_count = rows.len();
    let filtered: Vec<&serde_json::Map<String, Value>> = match &computation.filter {
        Some(filter) => rows
            .into_iter()
            .filter(|row| {
                let actual = row.get(&filter.source).cloned().unwrap_or(Value::Null);
                filter.operator.compare(&actual, &filter.operand)
            })
            .collect(),
        None => rows,
    };
    let filtered_count = filtered.len();
    let column: Vec<Value> = filtered
        .iter()
        .filter_map(|row| row.get(child))
        .cloned()
        .collect();
    ComputeResult {
        value: reduce(computation, &column),
        source_count,
        filtered_count: Some(filtered_count),
    }
}

fn reduce(computation: &Computation, column: &[Value]) -> Value {
    match computation.function {
        AggregateFn::Sum | AggregateFn::Avg | AggregateFn::Max | AggregateFn::Min => {
            // non-numeric and unparsable values are excluded, not zeroed
            let numbers: Vec<f64> = column.iter().filter_map(as_number).collect();
            let raw = match computation.function {
                AggregateFn::Sum => numbers.iter().sum(),
                AggregateFn::Avg => {
                    if numbers.is_empty() {
                        0.0
                    } else {
                        numbers.iter().sum::<f64>() / numbers.len() as f64
                    }
                }
                AggregateFn::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                AggregateFn::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
                AggregateFn::Count | AggregateFn::Concat => unreachable!("handled below"),
            };
            let raw = if numbers.is_empty() { 0.0 } else { raw };
            let precision = computation.precision.unwrap_or(DEFAULT_PRECISION);
            numeric_value(round_half_away(raw, precision))
        }
        AggregateFn::Count => {
            let count = column.iter().filter(|value| !is_empty_value(value)).count();
            json!(count)
        }
        AggregateFn::Concat => {
            let separator = computation.separator.as_deref().unwrap_or(DEFAULT_SEPARATOR);
            let parts: Vec<String> = column
                .iter()
                .filter(|value| !is_empty_value(value))
                .map(value_text)
                .collect();
            Value::String(parts.join(separator))
        }
    }
}

/// Integral results become JSON integers so `30` never renders as `30.0`.
fn numeric_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        json!(number as i64)
    } else {
        serde_json::Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
