//! Compiler tests: purity, idempotence and lookup index construction.

use formkit_compile::compile;
use formkit_model::{
    AggregateFn, ChoiceOption, Computation, FieldId, FieldKey, FieldKind, FieldNode, FieldType,
    FormId, FormSchema,
};
use serde_json::json;

fn field_id(value: &str) -> FieldId {
    FieldId::new(value).unwrap()
}

fn field_key(value: &str) -> FieldKey {
    FieldKey::new(value).unwrap()
}

fn sample_schema() -> FormSchema {
    let mut name = FieldNode::new(field_id("f1"), field_key("name"), "Name", FieldKind::Text);
    name.constraint.required = true;
    name.presentation.placeholder = Some("Full name".to_string());
    name.constraint.pattern = Some("^[A-Za-z ]+$".to_string());

    let size = FieldNode::new(
        field_id("f2"),
        field_key("size"),
        "Size",
        FieldKind::SingleChoice {
            options: vec![
                ChoiceOption::new("s", "Small"),
                ChoiceOption::new("m", "Medium"),
            ],
        },
    );

    let items = FieldNode::new(
        field_id("f3"),
        field_key("items"),
        "Items",
        FieldKind::SubTable {
            children: vec![FieldNode::new(
                field_id("f4"),
                field_key("amount"),
                "Amount",
                FieldKind::Number,
            )],
        },
    );

    let total = FieldNode::new(
        field_id("f5"),
        field_key("total"),
        "Total",
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
        .with_fields(vec![name, size, items, total])
}

#[test]
fn builds_lookup_maps_in_one_pass() {
    let schema = sample_schema();
    let compiled = compile(&schema);

    assert_eq!(compiled.by_id.len(), 5);
    assert_eq!(compiled.by_key.len(), 5);
    assert_eq!(
        compiled
            .field_by_id(&field_id("f4"))
            .unwrap()
            .key
            .as_str(),
        "amount"
    );
    assert_eq!(
        compiled
            .field_by_key(&field_key("items"))
            .unwrap()
            .id
            .as_str(),
        "f3"
    );
}

#[test]
fn render_nodes_carry_presentation_attributes() {
    let compiled = compile(&sample_schema());

    let name = &compiled.nodes[0];
    assert_eq!(name.field_type, FieldType::Text);
    assert!(name.required);
    assert_eq!(name.placeholder.as_deref(), Some("Full name"));
    assert!(name.visible);

    let size = &compiled.nodes[1];
    assert_eq!(size.options.len(), 2);

    let items = &compiled.nodes[2];
    assert_eq!(items.children.len(), 1);
    assert_eq!(items.children[0].field_type, FieldType::Number);

    let total = &compiled.nodes[3];
    let computation = total.computation.as_ref().unwrap();
    assert_eq!(computation.source, "items.amount");

    // data-constraint internals never reach render nodes
    let rendered = serde_json::to_value(name).unwrap();
    assert!(rendered.get("pattern").is_none());
    assert!(rendered.get("constraint").is_none());
}

#[test]
fn compiling_is_pure_and_idempotent() {
    let schema = sample_schema();
    let before = schema.clone();
    let first = compile(&schema);
    let second = compile(&schema);
    assert_eq!(first, second);
    assert_eq!(schema, before);
}

#[test]
fn flatten_is_pre_order() {
    let compiled = compile(&sample_schema());
    let keys: Vec<&str> = compiled
        .flatten()
        .iter()
        .map(|node| node.key.as_str())
        .collect();
    assert_eq!(keys, ["name", "size", "items", "amount", "total"]);
}

#[test]
fn artifact_serializes_as_plain_data() {
    let compiled = compile(&sample_schema());
    let encoded = serde_json::to_value(&compiled).unwrap();
    assert_eq!(encoded["version"], json!(2));
    assert_eq!(encoded["nodes"][2]["children"][0]["key"], json!("amount"));
    assert!(encoded["by_key"]["total"].is_object());
}
