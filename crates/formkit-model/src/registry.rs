//! Field type registry: the per-kind default value and validation seam.
//!
//! Every built-in kind implements the same four-operation contract, so new
//! kinds plug in without touching tree operations or the compiler. The
//! registry is an explicitly constructed instance handed to the engines that
//! need it; there is no global.

use std::collections::BTreeMap;

use regex::Regex;
use serde_json::{Value, json};

use crate::field::{FieldCategory, FieldNode, FieldType};
use crate::value::{as_number, is_empty_value};

/// Outcome of a per-field validation check.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub message: Option<String>,
}

impl CheckResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

/// Behavior contract of one field kind.
pub trait FieldBehavior {
    /// Default live value when no explicit default is configured.
    fn default_value(&self) -> Value;

    /// Validate a live value against the node's constraint block.
    fn validate(&self, value: &Value, node: &FieldNode) -> CheckResult;

    /// Palette grouping for editors.
    fn category(&self) -> FieldCategory;

    /// Whether this kind may be used as a sub-table column.
    fn allowed_in_subtable(&self) -> bool;
}

pub struct FieldTypeRegistry {
    behaviors: BTreeMap<FieldType, Box<dyn FieldBehavior>>,
}

impl FieldTypeRegistry {
    /// Registry with one entry per built-in kind.
    pub fn builtin() -> Self {
        let mut registry = Self {
            behaviors: BTreeMap::new(),
        };
        registry.register(FieldType::Text, Box::new(TextBehavior));
        registry.register(FieldType::Textarea, Box::new(TextareaBehavior));
        registry.register(FieldType::Number, Box::new(NumberBehavior));
        registry.register(FieldType::Date, Box::new(DateBehavior));
        registry.register(FieldType::SingleChoice, Box::new(SingleChoiceBehavior));
        registry.register(FieldType::MultiChoice, Box::new(MultiChoiceBehavior));
        registry.register(FieldType::SubTable, Box::new(SubTableBehavior));
        registry.register(FieldType::Computed, Box::new(ComputedBehavior));
        registry
    }

    /// Register or replace the behavior for a field type. This is the
    /// extension seam for custom kinds.
    pub fn register(&mut self, field_type: FieldType, behavior: Box<dyn FieldBehavior>) {
        self.behaviors.insert(field_type, behavior);
    }

    pub fn behavior(&self, field_type: FieldType) -> Option<&dyn FieldBehavior> {
        self.behaviors.get(&field_type).map(Box::as_ref)
    }

    /// Default value for a node: its configured default, falling back to the
    /// kind's producer, falling back to null for unregistered kinds.
    pub fn default_for(&self, node: &FieldNode) -> Value {
        if let Some(default) = &node.constraint.default_value {
            return default.clone();
        }
        self.behavior(node.field_type())
            .map_or(Value::Null, FieldBehavior::default_value)
    }

    /// Validate a value against a node. Unregistered kinds pass.
    pub fn validate(&self, value: &Value, node: &FieldNode) -> CheckResult {
        self.behavior(node.field_type())
            .map_or_else(CheckResult::ok, |behavior| behavior.validate(value, node))
    }

    pub fn allowed_in_subtable(&self, field_type: FieldType) -> bool {
        self.behavior(field_type)
            .is_some_and(FieldBehavior::allowed_in_subtable)
    }

    pub fn category(&self, field_type: FieldType) -> Option<FieldCategory> {
        self.behavior(field_type).map(FieldBehavior::category)
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Shared required check. A required field with an empty value fails;
/// an empty optional value passes without running further checks.
fn check_required(value: &Value, node: &FieldNode) -> Option<CheckResult> {
    if is_empty_value(value) {
        if node.constraint.required {
            return Some(CheckResult::fail(format!("{} is required", node.label)));
        }
        return Some(CheckResult::ok());
    }
    None
}

fn check_text(value: &Value, node: &FieldNode) -> CheckResult {
    if let Some(result) = check_required(value, node) {
        return result;
    }
    let Some(text) = value.as_str() else {
        return CheckResult::fail(format!("{} must be text", node.label));
    };
    if let Some(max_length) = node.constraint.max_length
        && text.chars().count() > max_length
    {
        return CheckResult::fail(format!(
            "{} must be at most {max_length} characters",
            node.label
        ));
    }
    if let Some(pattern) = &node.constraint.pattern
        && let Ok(regex) = Regex::new(pattern)
        && !regex.is_match(text)
    {
        return CheckResult::fail(format!("{} does not match the expected format", node.label));
    }
    CheckResult::ok()
}

struct TextBehavior;

impl FieldBehavior for TextBehavior {
    fn default_value(&self) -> Value {
        json!("")
    }

    fn validate(&self, value: &Value, node: &FieldNode) -> CheckResult {
        check_text(value, node)
    }

    fn category(&self) -> FieldCategory {
        FieldCategory::Basic
    }

    fn allowed_in_subtable(&self) -> bool {
        true
    }
}

struct TextareaBehavior;

impl FieldBehavior for TextareaBehavior {
    fn default_value(&self) -> Value {
        json!("")
    }

    fn validate(&self, value: &Value, node: &FieldNode) -> CheckResult {
        check_text(value, node)
    }

    fn category(&self) -> FieldCategory {
        FieldCategory::Basic
    }

    fn allowed_in_subtable(&self) -> bool {
        true
    }
}

struct NumberBehavior;

impl FieldBehavior for NumberBehavior {
    fn default_value(&self) -> Value {
        Value::Null
    }

    fn validate(&self, value: &Value, node: &FieldNode) -> CheckResult {
        if let Some(result) = check_required(value, node) {
            return result;
        }
        let Some(number) = as_number(value) else {
            return CheckResult::fail(format!("{} must be a number", node.label));
        };
        if let Some(min) = node.constraint.min
            && number < min
        {
            return CheckResult::fail(format!("{} must be at least {min}", node.label));
        }
        if let Some(max) = node.constraint.max
            && number > max
        {
            return CheckResult::fail(format!("{} must be at most {max}", node.label));
        }
        CheckResult::ok()
    }

    fn category(&self) -> FieldCategory {
        FieldCategory::Basic
    }

    fn allowed_in_subtable(&self) -> bool {
        true
    }
}

struct DateBehavior;

impl FieldBehavior for DateBehavior {
    fn default_value(&self) -> Value {
        Value::Null
    }

    fn validate(&self, value: &Value, node: &FieldNode) -> CheckResult {
        if let Some(result) = check_required(value, node) {
            return result;
        }
        let valid = value.as_str().is_some_and(is_iso_date);
        if valid {
            CheckResult::ok()
        } else {
            CheckResult::fail(format!("{} must be a date (YYYY-MM-DD)", node.label))
        }
    }

    fn category(&self) -> FieldCategory {
        FieldCategory::Basic
    }

    fn allowed_in_subtable(&self) -> bool {
        true
    }
}

fn is_iso_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    if !(digits(0..4) && digits(5..7) && digits(8..10)) {
        return false;
    }
    let month: u32 = text[5..7].parse().unwrap_or(0);
    let day: u32 = text[8..10].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

struct SingleChoiceBehavior;

impl FieldBehavior for SingleChoiceBehavior {
    fn default_value(&self) -> Value {
        json!("")
    }

    fn validate(&self, value: &Value, node: &FieldNode) -> CheckResult {
        if let Some(result) = check_required(value, node) {
            return result;
        }
        let options = node.kind.options().unwrap_or_default();
        let chosen = value.as_str().unwrap_or_default();
        if options.iter().any(|option| option.value == chosen) {
            CheckResult::ok()
        } else {
            CheckResult::fail(format!("{} has an unknown option {chosen:?}", node.label))
        }
    }

    fn category(&self) -> FieldCategory {
        FieldCategory::Choice
    }

    fn allowed_in_subtable(&self) -> bool {
        true
    }
}

struct MultiChoiceBehavior;

impl FieldBehavior for MultiChoiceBehavior {
    fn default_value(&self) -> Value {
        json!([])
    }

    fn validate(&self, value: &Value, node: &FieldNode) -> CheckResult {
        if let Some(result) = check_required(value, node) {
            return result;
        }
        let Some(chosen) = value.as_array() else {
            return CheckResult::fail(format!("{} must be a list of options", node.label));
        };
        let options = node.kind.options().unwrap_or_default();
        for entry in chosen {
            let entry = entry.as_str().unwrap_or_default();
            if !options.iter().any(|option| option.value == entry) {
                return CheckResult::fail(format!(
                    "{} has an unknown option {entry:?}",
                    node.label
                ));
            }
        }
        CheckResult::ok()
    }

    fn category(&self) -> FieldCategory {
        FieldCategory::Choice
    }

    fn allowed_in_subtable(&self) -> bool {
        true
    }
}

struct SubTableBehavior;

impl FieldBehavior for SubTableBehavior {
    fn default_value(&self) -> Value {
        json!([])
    }

    /// Row contents are validated per child field by the data engine; here
    /// only the container shape and the required flag are checked.
    fn validate(&self, value: &Value, node: &FieldNode) -> CheckResult {
        if let Some(result) = check_required(value, node) {
            return result;
        }
        if value.is_array() {
            CheckResult::ok()
        } else {
            CheckResult::fail(format!("{} must be a list of rows", node.label))
        }
    }

    fn category(&self) -> FieldCategory {
        FieldCategory::Structure
    }

    fn allowed_in_subtable(&self) -> bool {
        false
    }
}

struct ComputedBehavior;

impl FieldBehavior for ComputedBehavior {
    fn default_value(&self) -> Value {
        Value::Null
    }

    /// Computed values are derived, never user input.
    fn validate(&self, _value: &Value, _node: &FieldNode) -> CheckResult {
        CheckResult::ok()
    }

    fn category(&self) -> FieldCategory {
        FieldCategory::Logic
    }

    fn allowed_in_subtable(&self) -> bool {
        false
    }
}
