//! Registry tests: per-kind defaults and validation behavior.

use formkit_model::{
    CheckResult, ChoiceOption, FieldBehavior, FieldCategory, FieldId, FieldKey, FieldKind,
    FieldNode, FieldType, FieldTypeRegistry, FormSchema, FormId, UndoHistory,
};
use serde_json::{Value, json};

fn node(kind: FieldKind) -> FieldNode {
    FieldNode::new(
        FieldId::new("f1").unwrap(),
        FieldKey::new("field").unwrap(),
        "Field",
        kind,
    )
}

#[test]
fn defaults_per_kind() {
    let registry = FieldTypeRegistry::builtin();
    assert_eq!(registry.default_for(&node(FieldKind::Text)), json!(""));
    assert_eq!(registry.default_for(&node(FieldKind::Number)), Value::Null);
    assert_eq!(
        registry.default_for(&node(FieldKind::MultiChoice { options: vec![] })),
        json!([])
    );
    assert_eq!(
        registry.default_for(&node(FieldKind::SubTable { children: vec![] })),
        json!([])
    );

    let mut with_default = node(FieldKind::Number);
    with_default.constraint.default_value = Some(json!(7));
    assert_eq!(registry.default_for(&with_default), json!(7));
}

#[test]
fn required_and_optional_empty_values() {
    let registry = FieldTypeRegistry::builtin();
    let mut required = node(FieldKind::Text);
    required.constraint.required = true;
    let check = registry.validate(&json!(""), &required);
    assert!(!check.valid);
    assert!(check.message.unwrap().contains("required"));

    // optional empty passes without further checks
    let optional = node(FieldKind::Number);
    assert!(registry.validate(&Value::Null, &optional).valid);
}

#[test]
fn number_bounds_and_coercion() {
    let registry = FieldTypeRegistry::builtin();
    let mut number = node(FieldKind::Number);
    number.constraint.min = Some(1.0);
    number.constraint.max = Some(10.0);
    assert!(registry.validate(&json!(5), &number).valid);
    assert!(registry.validate(&json!("5"), &number).valid);
    assert!(!registry.validate(&json!(0), &number).valid);
    assert!(!registry.validate(&json!(11), &number).valid);
    assert!(!registry.validate(&json!("abc"), &number).valid);
}

#[test]
fn text_length_and_pattern() {
    let registry = FieldTypeRegistry::builtin();
    let mut text = node(FieldKind::Text);
    text.constraint.max_length = Some(3);
    assert!(registry.validate(&json!("abc"), &text).valid);
    assert!(!registry.validate(&json!("abcd"), &text).valid);

    text.constraint.max_length = None;
    text.constraint.pattern = Some("^[a-z]+$".to_string());
    assert!(registry.validate(&json!("abc"), &text).valid);
    assert!(!registry.validate(&json!("ABC"), &text).valid);

    // an uncompilable pattern skips the check rather than failing the value
    text.constraint.pattern = Some("([".to_string());
    assert!(registry.validate(&json!("anything"), &text).valid);
}

#[test]
fn date_shape() {
    let registry = FieldTypeRegistry::builtin();
    let date = node(FieldKind::Date);
    assert!(registry.validate(&json!("2026-08-30"), &date).valid);
    assert!(!registry.validate(&json!("2026-13-01"), &date).valid);
    assert!(!registry.validate(&json!("30/08/2026"), &date).valid);
    assert!(!registry.validate(&json!(20260830), &date).valid);
}

#[test]
fn choice_membership() {
    let registry = FieldTypeRegistry::builtin();
    let options = vec![
        ChoiceOption::new("s", "Small"),
        ChoiceOption::new("m", "Medium"),
    ];
    let single = node(FieldKind::SingleChoice {
        options: options.clone(),
    });
    assert!(registry.validate(&json!("s"), &single).valid);
    assert!(!registry.validate(&json!("xl"), &single).valid);

    let multi = node(FieldKind::MultiChoice { options });
    assert!(registry.validate(&json!(["s", "m"]), &multi).valid);
    assert!(!registry.validate(&json!(["s", "xl"]), &multi).valid);
    assert!(!registry.validate(&json!("s"), &multi).valid);
}

#[test]
fn structural_kinds_are_not_allowed_in_subtables() {
    let registry = FieldTypeRegistry::builtin();
    assert!(registry.allowed_in_subtable(FieldType::Text));
    assert!(registry.allowed_in_subtable(FieldType::Number));
    assert!(!registry.allowed_in_subtable(FieldType::SubTable));
    assert!(!registry.allowed_in_subtable(FieldType::Computed));
    assert_eq!(
        registry.category(FieldType::SubTable),
        Some(FieldCategory::Structure)
    );
}

#[test]
fn custom_kinds_plug_into_the_registry() {
    struct UppercaseBehavior;

    impl FieldBehavior for UppercaseBehavior {
        fn default_value(&self) -> Value {
            json!("")
        }

        fn validate(&self, value: &Value, _node: &FieldNode) -> CheckResult {
            match value.as_str() {
                Some(s) if s.chars().all(char::is_uppercase) => CheckResult::ok(),
                _ => CheckResult::fail("must be uppercase"),
            }
        }

        fn category(&self) -> FieldCategory {
            FieldCategory::Basic
        }

        fn allowed_in_subtable(&self) -> bool {
            true
        }
    }

    let mut registry = FieldTypeRegistry::builtin();
    registry.register(FieldType::Text, Box::new(UppercaseBehavior));
    let text = node(FieldKind::Text);
    assert!(registry.validate(&json!("ABC"), &text).valid);
    assert!(!registry.validate(&json!("abc"), &text).valid);
}

#[test]
fn undo_history_drops_oldest_on_overflow() {
    let base = FormSchema::new(FormId::new("form-1").unwrap(), "Form");
    let mut history = UndoHistory::with_capacity(3);
    for version in 1..=5u64 {
        let mut snapshot = base.clone();
        snapshot.version = version;
        history.push(snapshot);
    }
    assert_eq!(history.len(), 3);
    assert_eq!(history.undo().unwrap().version, 5);
    assert_eq!(history.undo().unwrap().version, 4);
    assert_eq!(history.undo().unwrap().version, 3);
    assert!(history.undo().is_none());
}
