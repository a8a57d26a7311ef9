//! Data engine tests: state lifecycle, row operations, validation passes,
//! rule/compute integration and the observer contract.

use std::cell::RefCell;
use std::rc::Rc;

use formkit_model::{
    AggregateFn, CompareOp, Computation, Condition, FieldId, FieldKey, FieldKind, FieldNode,
    FieldTypeRegistry, FormId, FormSchema, Row, RuleAction, RuleDescriptor, RuleId, RuleKind,
};
use formkit_runtime::{ChangeEvent, DataEngine};
use serde_json::{Value, json};

fn field_id(value: &str) -> FieldId {
    FieldId::new(value).unwrap()
}

fn field(id: &str, key: &str, kind: FieldKind) -> FieldNode {
    FieldNode::new(
        field_id(id),
        FieldKey::new(key).unwrap(),
        key.to_string(),
        kind,
    )
}

/// `name` (required text), `qty` (number), `items` sub-table with a numeric
/// `amount` column, and a computed `total` = SUM(items.amount).
fn order_schema() -> FormSchema {
    let mut name = field("f1", "name", FieldKind::Text);
    name.constraint.required = true;

    let qty = field("f2", "qty", FieldKind::Number);

    let items = field(
        "t1",
        "items",
        FieldKind::SubTable {
            children: vec![field("c1", "amount", FieldKind::Number)],
        },
    );

    let total = field(
        "f3",
        "total",
        FieldKind::Computed {
            computation: Computation {
                id: "total".to_string(),
                function: AggregateFn::Sum,
                source: "items.amount".to_string(),
                filter: None,
                precision: Some(0),
                separator: None,
            },
        },
    );

    FormSchema::new(FormId::new("order").unwrap(), "Order")
        .with_fields(vec![name, qty, items, total])
}

#[test]
fn initializes_from_defaults_and_initial_data() {
    let registry = FieldTypeRegistry::builtin();
    let engine = DataEngine::new(order_schema(), &registry);
    assert_eq!(engine.value("name"), Some(&json!("")));
    assert_eq!(engine.value("qty"), Some(&Value::Null));
    assert_eq!(engine.value("items"), Some(&json!([])));
    assert_eq!(engine.value("total"), Some(&json!(0)));

    let mut initial = formkit_model::FormData::new();
    initial.insert("name".to_string(), json!("Ada"));
    let engine = DataEngine::with_data(order_schema(), &registry, initial);
    assert_eq!(engine.value("name"), Some(&json!("Ada")));
    assert_eq!(engine.value("qty"), Some(&Value::Null));
}

#[test]
fn set_value_validates_and_marks_touched() {
    let registry = FieldTypeRegistry::builtin();
    let mut engine = DataEngine::new(order_schema(), &registry);
    assert!(!engine.touched("name"));

    engine.set_value("name", json!(""));
    assert!(engine.touched("name"));
    assert!(engine.error("name").unwrap().contains("required"));

    engine.set_value("name", json!("Ada"));
    assert_eq!(engine.error("name"), None);

    engine.set_value("qty", json!("abc"));
    assert!(engine.error("qty").unwrap().contains("number"));
}

#[test]
fn row_operations_drive_the_computed_total() {
    let registry = FieldTypeRegistry::builtin();
    let mut engine = DataEngine::new(order_schema(), &registry);

    let mut row = Row::new();
    row.insert("amount".to_string(), json!(10));
    engine.add_row("items", Some(row));
    let mut row = Row::new();
    row.insert("amount".to_string(), json!(20));
    engine.add_row("items", Some(row));
    assert_eq!(engine.value("total"), Some(&json!(30)));

    engine.delete_row("items", 0);
    assert_eq!(engine.value("total"), Some(&json!(20)));

    let mut patch = Row::new();
    patch.insert("amount".to_string(), json!(5));
    engine.update_row("items", 0, patch);
    assert_eq!(engine.value("total"), Some(&json!(5)));

    // out-of-range and unknown tables are no-ops
    engine.delete_row("items", 9);
    engine.add_row("ghost", None);
    assert_eq!(engine.value("total"), Some(&json!(5)));
}

#[test]
fn add_row_synthesizes_defaults_per_child() {
    let registry = FieldTypeRegistry::builtin();
    let mut engine = DataEngine::new(order_schema(), &registry);
    engine.add_row("items", None);
    assert_eq!(engine.value("items"), Some(&json!([{ "amount": null }])));
}

#[test]
fn validate_all_replaces_the_error_map_atomically() {
    let registry = FieldTypeRegistry::builtin();
    let mut engine = DataEngine::new(order_schema(), &registry);

    // required `name` is empty, and one bad row value
    let mut row = Row::new();
    row.insert("amount".to_string(), json!("not a number"));
    engine.add_row("items", Some(row));
    assert!(!engine.validate_all());
    assert!(engine.errors().contains_key("name"));
    assert!(engine.errors().contains_key("items[0].amount"));

    // fixing name and the row, breaking qty: old errors must not survive
    engine.set_value("name", json!("Ada"));
    let mut patch = Row::new();
    patch.insert("amount".to_string(), json!(2));
    engine.update_row("items", 0, patch);
    engine.set_value("qty", json!("abc"));
    assert!(!engine.validate_all());
    assert!(!engine.errors().contains_key("name"));
    assert!(!engine.errors().contains_key("items[0].amount"));
    assert!(engine.errors().contains_key("qty"));

    engine.set_value("qty", json!(3));
    assert!(engine.validate_all());
    assert!(engine.errors().is_empty());
}

#[test]
fn reset_collapses_to_defaults() {
    let registry = FieldTypeRegistry::builtin();
    let mut engine = DataEngine::new(order_schema(), &registry);
    engine.set_value("name", json!(""));
    engine.add_row("items", None);
    assert!(engine.touched("name"));
    assert!(engine.error("name").is_some());

    engine.reset();
    assert_eq!(engine.value("name"), Some(&json!("")));
    assert_eq!(engine.value("items"), Some(&json!([])));
    assert_eq!(engine.value("total"), Some(&json!(0)));
    assert!(!engine.touched("name"));
    assert!(engine.errors().is_empty());
}

#[test]
fn listeners_are_notified_after_each_mutation() {
    let registry = FieldTypeRegistry::builtin();
    let mut engine = DataEngine::new(order_schema(), &registry);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    engine.subscribe(move |event: &ChangeEvent| sink.borrow_mut().push(event.clone()));

    engine.set_value("qty", json!(2));
    engine.add_row("items", None);
    engine.validate_all();
    engine.reset();

    let events = events.borrow();
    assert_eq!(events[0], ChangeEvent::FieldChanged {
        key: "qty".to_string()
    });
    assert_eq!(events[1], ChangeEvent::RowsChanged {
        table: "items".to_string()
    });
    assert_eq!(events[2], ChangeEvent::Validated);
    assert_eq!(events[3], ChangeEvent::Reset);
}

#[test]
fn batch_set_refreshes_once() {
    let registry = FieldTypeRegistry::builtin();
    let mut engine = DataEngine::new(order_schema(), &registry);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    engine.subscribe(move |event: &ChangeEvent| sink.borrow_mut().push(event.clone()));

    let mut batch = formkit_model::FormData::new();
    batch.insert("name".to_string(), json!("Ada"));
    batch.insert("qty".to_string(), json!(4));
    engine.set_values(batch);

    assert_eq!(engine.value("name"), Some(&json!("Ada")));
    assert!(engine.touched("qty"));
    assert_eq!(events.borrow().len(), 1);
    assert_eq!(events.borrow()[0], ChangeEvent::BatchChanged {
        keys: vec!["name".to_string(), "qty".to_string()],
    });
}

#[test]
fn set_value_rules_flow_into_live_data_and_rule_state() {
    let mut schema = order_schema();
    schema.rules = vec![
        RuleDescriptor {
            id: RuleId::new("r1").unwrap(),
            name: "copy qty".to_string(),
            kind: RuleKind::SetValue,
            condition: Condition {
                source: field_id("f1"),
                operator: CompareOp::Eq,
                operand: json!("express"),
            },
            action: RuleAction {
                target: field_id("f2"),
                payload: json!(99),
            },
        },
        RuleDescriptor {
            id: RuleId::new("r2").unwrap(),
            name: "hide qty".to_string(),
            kind: RuleKind::Visibility,
            condition: Condition {
                source: field_id("f2"),
                operator: CompareOp::Gt,
                operand: json!(50),
            },
            action: RuleAction {
                target: field_id("f2"),
                payload: json!(false),
            },
        },
    ];
    let registry = FieldTypeRegistry::builtin();
    let mut engine = DataEngine::new(schema, &registry);
    assert!(engine.rule_state().set_value.is_empty());

    engine.set_value("name", json!("express"));
    // the set-value payload landed in live data
    assert_eq!(engine.value("qty"), Some(&json!(99)));
    // and the visibility rule saw it within the same pass
    assert_eq!(
        engine.rule_state().visibility.get(&field_id("f2")),
        Some(&false)
    );
}
