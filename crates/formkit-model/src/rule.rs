//! Rule descriptors: first-order condition/action pairs.
//!
//! Rules are intentionally flat — one condition, one action, no nesting and
//! no embedded expressions — so evaluation is total and side-effect free.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{FieldId, RuleId};
use crate::value::{as_number, is_empty_value};

/// Rule kinds in their evaluation order: set-value runs before required,
/// required before visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    SetValue,
    Required,
    Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Contains,
    IsEmpty,
    IsNotEmpty,
}

impl CompareOp {
    pub fn needs_operand(&self) -> bool {
        !matches!(self, CompareOp::IsEmpty | CompareOp::IsNotEmpty)
    }

    /// Apply the operator to a resolved value and the condition operand.
    ///
    /// Equality between a scalar and an array means "is element of"; Gt/Lt
    /// coerce both sides numerically; Contains is array membership or
    /// substring; emptiness covers null, empty string and empty array.
    pub fn compare(&self, actual: &Value, operand: &Value) -> bool {
        match self {
            CompareOp::Eq => values_match(actual, operand),
            CompareOp::Ne => !values_match(actual, operand),
            CompareOp::Gt => match (as_number(actual), as_number(operand)) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
            CompareOp::Lt => match (as_number(actual), as_number(operand)) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
            CompareOp::Contains => match actual {
                Value::Array(items) => items.iter().any(|item| loose_eq(item, operand)),
                Value::String(s) => operand.as_str().is_some_and(|needle| s.contains(needle)),
                _ => false,
            },
            CompareOp::IsEmpty => is_empty_value(actual),
            CompareOp::IsNotEmpty => !is_empty_value(actual),
        }
    }
}

fn values_match(actual: &Value, operand: &Value) -> bool {
    match (actual, operand) {
        (Value::Array(items), single) if !single.is_array() => {
            items.iter().any(|item| loose_eq(item, single))
        }
        (single, Value::Array(items)) if !single.is_array() => {
            items.iter().any(|item| loose_eq(item, single))
        }
        _ => loose_eq(actual, operand),
    }
}

/// Equality with numeric coercion, so `"5"` and `5` compare equal.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    a == b
}

/// The single condition of a rule: source field, operator, operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub source: FieldId,
    pub operator: CompareOp,
    #[serde(default)]
    pub operand: Value,
}

/// The single action of a rule: target field and a literal payload.
/// For required/visibility rules the payload is the boolean to apply;
/// for set-value rules it is the value written into live data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    pub target: FieldId,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub id: RuleId,
    pub name: String,
    pub kind: RuleKind,
    pub condition: Condition,
    pub action: RuleAction,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn equality_is_membership_against_arrays() {
        assert!(CompareOp::Eq.compare(&json!(["a", "b"]), &json!("a")));
        assert!(CompareOp::Eq.compare(&json!("b"), &json!(["a", "b"])));
        assert!(!CompareOp::Eq.compare(&json!(["a"]), &json!("b")));
        assert!(CompareOp::Ne.compare(&json!(["a"]), &json!("b")));
    }

    #[test]
    fn comparisons_coerce_numerically() {
        assert!(CompareOp::Gt.compare(&json!("10"), &json!(5)));
        assert!(CompareOp::Lt.compare(&json!(3), &json!("4.5")));
        assert!(!CompareOp::Gt.compare(&json!("abc"), &json!(5)));
        assert!(CompareOp::Eq.compare(&json!("5"), &json!(5.0)));
    }

    #[test]
    fn contains_handles_arrays_and_substrings() {
        assert!(CompareOp::Contains.compare(&json!([1, 2, 3]), &json!(2)));
        assert!(CompareOp::Contains.compare(&json!("hello world"), &json!("wor")));
        assert!(!CompareOp::Contains.compare(&json!(42), &json!(4)));
    }

    #[test]
    fn emptiness_operators() {
        assert!(CompareOp::IsEmpty.compare(&Value::Null, &Value::Null));
        assert!(CompareOp::IsEmpty.compare(&json!(""), &Value::Null));
        assert!(CompareOp::IsNotEmpty.compare(&json!(0), &Value::Null));
    }
}
