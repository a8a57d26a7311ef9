pub mod error;
pub mod field;
pub mod ids;
pub mod registry;
pub mod rule;
pub mod schema;
pub mod tree;
pub mod value;

pub use error::{ModelError, Result};
pub use field::{
    AggregateFn, ChoiceOption, ComputeFilter, Computation, DataConstraint, FieldCategory,
    FieldKind, FieldNode, FieldType, Presentation, WidthClass,
};
pub use ids::{FieldId, FieldKey, FormId, RuleId};
pub use registry::{CheckResult, FieldBehavior, FieldTypeRegistry};
pub use rule::{CompareOp, Condition, RuleAction, RuleDescriptor, RuleKind};
pub use schema::{FormSchema, UNDO_CAPACITY, UndoHistory};
pub use tree::{FieldPatch, Position};
pub use value::{FormData, Row, as_number, is_empty_value, resolve_path, round_half_away};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_reject_blank_input() {
        assert!(FieldId::new("  ").is_err());
        assert!(FieldKey::new("items.amount").is_err());
        assert!(FieldKey::new("rows[0]").is_err());
        assert_eq!(FieldId::new(" f1 ").unwrap().as_str(), "f1");
    }

    #[test]
    fn schema_round_trips_through_json() {
        let mut schema = FormSchema::new(FormId::new("form-1").unwrap(), "Order form");
        schema.fields.push(FieldNode::new(
            FieldId::new("f1").unwrap(),
            FieldKey::new("qty").unwrap(),
            "Quantity",
            FieldKind::Number,
        ));
        let json = serde_json::to_string(&schema).expect("serialize schema");
        let round: FormSchema = serde_json::from_str(&json).expect("deserialize schema");
        assert_eq!(round, schema);
    }

    #[test]
    fn with_fields_bumps_version_and_preserves_input() {
        let schema = FormSchema::new(FormId::new("form-1").unwrap(), "Order form");
        let next = schema.with_fields(vec![FieldNode::new(
            FieldId::new("f1").unwrap(),
            FieldKey::new("qty").unwrap(),
            "Quantity",
            FieldKind::Number,
        )]);
        assert_eq!(schema.version, 1);
        assert_eq!(next.version, 2);
        assert!(schema.fields.is_empty());
        assert_eq!(next.fields.len(), 1);
    }
}
