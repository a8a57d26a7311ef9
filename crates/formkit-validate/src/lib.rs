//! Schema validation: structural checks a form schema must pass before it
//! is published to a runtime.
//!
//! Validation never mutates the schema and never short-circuits: the report
//! carries every issue found so an editor can surface them all at once.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use formkit_model::{FieldId, FieldKind, FieldNode, FieldTypeRegistry, FormSchema, tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One problem found in a schema.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: Severity,
    /// Stable machine-readable check name (e.g. "duplicate_id").
    pub category: String,
    /// Field the issue is anchored to, when one applies.
    pub field: Option<FieldId>,
    pub message: String,
}

/// Validation report for a single schema.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaReport {
    pub form_id: String,
    pub issues: Vec<Issue>,
}

impl SchemaReport {
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    fn error(&mut self, category: &str, field: Option<&FieldId>, message: String) {
        self.issues.push(Issue {
            severity: Severity::Error,
            category: category.to_string(),
            field: field.cloned(),
            message,
        });
    }

    fn warning(&mut self, category: &str, field: Option<&FieldId>, message: String) {
        self.issues.push(Issue {
            severity: Severity::Warning,
            category: category.to_string(),
            field: field.cloned(),
            message,
        });
    }
}

/// Run every structural check against a schema.
pub fn validate_schema(schema: &FormSchema, registry: &FieldTypeRegistry) -> SchemaReport {
    let mut report = SchemaReport {
        form_id: schema.id.as_str().to_string(),
        issues: Vec::new(),
    };

    check_identifiers(schema, &mut report);
    check_fields(&schema.fields, registry, None, &mut report);
    check_computations(schema, &mut report);
    check_rules(schema, &mut report);

    report
}

/// Field ids and keys must be unique across the whole tree, sub-table
/// children included.
fn check_identifiers(schema: &FormSchema, report: &mut SchemaReport) {
    let mut ids = BTreeSet::new();
    let mut keys = BTreeSet::new();
    tree::walk(&schema.fields, &mut |node| {
        if !ids.insert(node.id.clone()) {
            report.error(
                "duplicate_id",
                Some(&node.id),
                format!("field id '{}' is used more than once", node.id),
            );
        }
        if !keys.insert(node.key.clone()) {
            report.error(
                "duplicate_key",
                Some(&node.id),
                format!("field key '{}' is used more than once", node.key),
            );
        }
    });
}

fn check_fields(
    forest: &[FieldNode],
    registry: &FieldTypeRegistry,
    parent_table: Option<&FieldId>,
    report: &mut SchemaReport,
) {
    for node in forest {
        if node.label.trim().is_empty() {
            report.error(
                "empty_label",
                Some(&node.id),
                format!("field '{}' has an empty label", node.key),
            );
        }

        if parent_table.is_some() && !registry.allowed_in_subtable(node.kind.field_type()) {
            report.error(
                "nested_field_type",
                Some(&node.id),
                format!(
                    "field '{}' ({}) is not allowed inside a sub-table",
                    node.key,
                    node.kind.field_type()
                ),
            );
        }

        match &node.kind {
            FieldKind::SingleChoice { options } | FieldKind::MultiChoice { options }
                if options.is_empty() =>
            {
                report.warning(
                    "empty_choice",
                    Some(&node.id),
                    format!("choice field '{}' has no options", node.key),
                );
            }
            FieldKind::SubTable { children } => {
                check_fields(children, registry, Some(&node.id), report);
            }
            _ => {}
        }
    }
}

/// Every computation source must point at an existing field, and table
/// sources at an existing column of that table.
fn check_computations(schema: &FormSchema, report: &mut SchemaReport) {
    let columns = table_columns(&schema.fields);
    let top_level: BTreeSet<&str> = schema
        .fields
        .iter()
        .map(|node| node.key.as_str())
        .collect();

    tree::walk(&schema.fields, &mut |node| {
        let Some(computation) = node.kind.computation() else {
            return;
        };
        let source = computation.source.trim();
        if source.is_empty() {
            report.error(
                "empty_compute_source",
                Some(&node.id),
                format!("computed field '{}' has no source", node.key),
            );
            return;
        }
        let resolves = match source.split_once('.') {
            Some((table, column)) => columns
                .get(table)
                .is_some_and(|cols| cols.contains(column)),
            None => top_level.contains(source),
        };
        if !resolves {
            report.error(
                "unknown_compute_source",
                Some(&node.id),
                format!(
                    "computed field '{}' reads '{source}', which does not exist",
                    node.key
                ),
            );
        }
    });
}

/// Rules must reference existing fields, and a rule may only target a field
/// inside a sub-table when its source lives in the same sub-table.
fn check_rules(schema: &FormSchema, report: &mut SchemaReport) {
    let containers = containing_tables(&schema.fields);

    for rule in &schema.rules {
        let source = containers.get(&rule.condition.source);
        let target = containers.get(&rule.action.target);
        if source.is_none() {
            report.error(
                "unknown_rule_source",
                None,
                format!(
                    "rule '{}' reads unknown field '{}'",
                    rule.id, rule.condition.source
                ),
            );
        }
        if target.is_none() {
            report.error(
                "unknown_rule_target",
                None,
                format!(
                    "rule '{}' targets unknown field '{}'",
                    rule.id, rule.action.target
                ),
            );
        }
        if let (Some(source_table), Some(Some(target_table))) = (source, target)
            && source_table.as_ref() != Some(target_table)
        {
            report.error(
                "cross_table_rule",
                Some(&rule.action.target),
                format!(
                    "rule '{}' targets a field inside sub-table '{target_table}' from outside it",
                    rule.id
                ),
            );
        }
    }
}

/// Column key sets per top-level sub-table key.
fn table_columns(forest: &[FieldNode]) -> BTreeMap<String, BTreeSet<String>> {
    let mut tables = BTreeMap::new();
    for node in forest {
        if let FieldKind::SubTable { children } = &node.kind {
            let cols = children
                .iter()
                .map(|child| child.key.as_str().to_string())
                .collect();
            tables.insert(node.key.as_str().to_string(), cols);
        }
    }
    tables
}

/// Maps every field id to the id of the sub-table containing it, or `None`
/// for top-level fields.
fn containing_tables(forest: &[FieldNode]) -> BTreeMap<FieldId, Option<FieldId>> {
    fn visit(
        forest: &[FieldNode],
        parent: Option<&FieldId>,
        out: &mut BTreeMap<FieldId, Option<FieldId>>,
    ) {
        for node in forest {
            out.insert(node.id.clone(), parent.cloned());
            if let Some(children) = node.kind.children() {
                visit(children, Some(&node.id), out);
            }
        }
    }
    let mut out = BTreeMap::new();
    visit(forest, None, &mut out);
    out
}
