//! Data engine: owns the live form-data state for one runtime session.
//!
//! The engine composes the field type registry (defaults and validation),
//! the rule engine (visibility/required/value overrides) and the compute
//! engine with its cache (derived values) into a single mutable state. It
//! is single-threaded by design: every operation runs to completion, and a
//! multi-threaded host must serialize access to the whole instance.
//!
//! Listeners are notified synchronously after the state has been replaced,
//! never in the middle of a mutation.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use formkit_compute::ComputeCache;
use formkit_model::{
    Computation, FieldId, FieldKind, FieldNode, FieldTypeRegistry, FormData, FormSchema, Row,
};
use formkit_rules::{EvaluationContext, RuleOutcome, data_paths, evaluate};

/// What a mutation changed, handed to subscribed listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    FieldChanged { key: String },
    BatchChanged { keys: Vec<String> },
    RowsChanged { table: String },
    Validated,
    Reset,
}

type Listener<'a> = Box<dyn Fn(&ChangeEvent) + 'a>;

/// Live runtime state for one form session.
pub struct DataEngine<'a> {
    schema: FormSchema,
    registry: &'a FieldTypeRegistry,
    cache: ComputeCache,
    paths: BTreeMap<FieldId, String>,
    values: FormData,
    errors: BTreeMap<String, String>,
    touched: BTreeSet<String>,
    rule_state: RuleOutcome,
    listeners: Vec<Listener<'a>>,
}

impl<'a> DataEngine<'a> {
    /// Engine initialized from schema defaults.
    pub fn new(schema: FormSchema, registry: &'a FieldTypeRegistry) -> Self {
        Self::with_data(schema, registry, FormData::new())
    }

    /// Engine initialized from schema defaults overlaid with caller data.
    pub fn with_data(schema: FormSchema, registry: &'a FieldTypeRegistry, initial: FormData) -> Self {
        let paths = data_paths(&schema.fields);
        let mut values = default_values(&schema.fields, registry);
        values.extend(initial);
        let mut engine = Self {
            schema,
            registry,
            cache: ComputeCache::new(),
            paths,
            values,
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
            rule_state: RuleOutcome::default(),
            listeners: Vec::new(),
        };
        engine.refresh();
        engine
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn values(&self) -> &FormData {
        &self.values
    }

    /// Plain-record copy of the live data, for export collaborators.
    pub fn snapshot(&self) -> FormData {
        self.values.clone()
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn touched(&self, key: &str) -> bool {
        self.touched.contains(key)
    }

    /// Rule outcome of the most recent refresh.
    pub fn rule_state(&self) -> &RuleOutcome {
        &self.rule_state
    }

    pub fn subscribe(&mut self, listener: impl Fn(&ChangeEvent) + 'a) {
        self.listeners.push(Box::new(listener));
    }

    /// Set one field value: revalidates the field, marks it touched and
    /// refreshes rule and computed state.
    pub fn set_value(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
        self.touched.insert(key.to_string());
        self.cache.invalidate(key);
        self.validate_field(key);
        self.refresh();
        self.notify(&ChangeEvent::FieldChanged {
            key: key.to_string(),
        });
    }

    /// Batch set: one refresh and one notification for the whole batch.
    pub fn set_values(&mut self, entries: FormData) {
        let keys: Vec<String> = entries.keys().cloned().collect();
        for (key, value) in entries {
            self.touched.insert(key.clone());
            self.cache.invalidate(&key);
            self.values.insert(key, value);
        }
        for key in &keys {
            self.validate_field(key);
        }
        self.refresh();
        self.notify(&ChangeEvent::BatchChanged { keys });
    }

    /// Append a row to a sub-table. Without explicit data, one default value
    /// per child field type is synthesized.
    pub fn add_row(&mut self, table_key: &str, row: Option<Row>) {
        let Some(children) = self.table_children(table_key) else {
            debug!(table_key, "row added to unknown sub-table, ignored");
            return;
        };
        let row = row.unwrap_or_else(|| {
            let mut row = Row::new();
            for child in &children {
                row.insert(
                    child.key.as_str().to_string(),
                    self.registry.default_for(child),
                );
            }
            row
        });
        let entry = self
            .values
            .entry(table_key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(rows) = entry {
            rows.push(Value::Object(row));
        }
        self.after_row_change(table_key);
    }

    /// Merge a patch into one row. Out-of-range indices are a no-op.
    pub fn update_row(&mut self, table_key: &str, index: usize, patch: Row) {
        let Some(Value::Array(rows)) = self.values.get_mut(table_key) else {
            return;
        };
        let Some(Value::Object(row)) = rows.get_mut(index) else {
            return;
        };
        for (key, value) in patch {
            row.insert(key, value);
        }
        self.after_row_change(table_key);
    }

    pub fn delete_row(&mut self, table_key: &str, index: usize) {
        let Some(Value::Array(rows)) = self.values.get_mut(table_key) else {
            return;
        };
        if index >= rows.len() {
            return;
        }
        rows.remove(index);
        self.after_row_change(table_key);
    }

    /// Validate a single top-level field against its registered behavior.
    /// Returns whether the value is valid; the error map is updated either way.
    pub fn validate_field(&mut self, key: &str) -> bool {
        let Some(node) = self.schema.fields.iter().find(|n| n.key.as_str() == key) else {
            return true;
        };
        let value = self.values.get(key).cloned().unwrap_or(Value::Null);
        let check = self.registry.validate(&value, node);
        if check.valid {
            self.errors.remove(key);
        } else {
            self.errors.insert(
                key.to_string(),
                check
                    .message
                    .unwrap_or_else(|| "invalid value".to_string()),
            );
        }
        check.valid
    }

    /// Validate every field depth-first: leaves directly, sub-tables row by
    /// row against every child. The error map is replaced atomically, so no
    /// stale error survives a full pass.
    pub fn validate_all(&mut self) -> bool {
        let mut errors = BTreeMap::new();
        for node in &self.schema.fields {
            match &node.kind {
                FieldKind::SubTable { children } => {
                    let rows = self
                        .values
                        .get(node.key.as_str())
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    for (index, row) in rows.iter().enumerate() {
                        let row = row.as_object();
                        for child in children {
                            let value = row
                                .and_then(|r| r.get(child.key.as_str()))
                                .cloned()
                                .unwrap_or(Value::Null);
                            let check = self.registry.validate(&value, child);
                            if !check.valid {
                                errors.insert(
                                    format!("{}[{index}].{}", node.key, child.key),
                                    check
                                        .message
                                        .unwrap_or_else(|| "invalid value".to_string()),
                                );
                            }
                        }
                    }
                }
                // derived, never user input
                FieldKind::Computed { .. } => {}
                _ => {
                    let value = self
                        .values
                        .get(node.key.as_str())
                        .cloned()
                        .unwrap_or(Value::Null);
                    let check = self.registry.validate(&value, node);
                    if !check.valid {
                        errors.insert(
                            node.key.as_str().to_string(),
                            check
                                .message
                                .unwrap_or_else(|| "invalid value".to_string()),
                        );
                    }
                }
            }
        }
        let valid = errors.is_empty();
        self.errors = errors;
        self.notify(&ChangeEvent::Validated);
        valid
    }

    /// Discard all live state and rebuild from schema defaults.
    pub fn reset(&mut self) {
        self.values = default_values(&self.schema.fields, self.registry);
        self.errors.clear();
        self.touched.clear();
        self.cache = ComputeCache::new();
        self.refresh();
        self.notify(&ChangeEvent::Reset);
    }

    fn after_row_change(&mut self, table_key: &str) {
        self.touched.insert(table_key.to_string());
        self.cache.invalidate(table_key);
        self.refresh();
        self.notify(&ChangeEvent::RowsChanged {
            table: table_key.to_string(),
        });
    }

    /// Re-run rules and computations against the current values. Set-value
    /// payloads land in live data before computations read it.
    fn refresh(&mut self) {
        let outcome = evaluate(&self.schema.rules, &EvaluationContext {
            data: &self.values,
            paths: &self.paths,
        });
        for (target, value) in &outcome.set_value {
            let Some(path) = self.paths.get(target) else {
                continue;
            };
            // sub-table internals are row-addressed; only top-level targets
            // are written back here
            if path.contains('.') {
                continue;
            }
            if self.values.get(path) != Some(value) {
                self.values.insert(path.clone(), value.clone());
                self.cache.invalidate(path);
            }
        }
        self.rule_state = outcome;

        let computed: Vec<(String, Computation)> = self
            .schema
            .fields
            .iter()
            .filter_map(|node| match &node.kind {
                FieldKind::Computed { computation } => {
                    Some((node.key.as_str().to_string(), computation.clone()))
                }
                _ => None,
            })
            .collect();
        for (key, computation) in computed {
            let result = self.cache.get_or_compute(&computation, &self.values);
            self.values.insert(key, result.value);
        }
    }

    fn notify(&self, event: &ChangeEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    fn table_children(&self, table_key: &str) -> Option<Vec<FieldNode>> {
        self.schema
            .fields
            .iter()
            .find(|node| node.key.as_str() == table_key)
            .and_then(|node| match &node.kind {
                FieldKind::SubTable { children } => Some(children.clone()),
                _ => None,
            })
    }
}

fn default_values(fields: &[FieldNode], registry: &FieldTypeRegistry) -> FormData {
    let mut values = FormData::new();
    for node in fields {
        values.insert(node.key.as_str().to_string(), registry.default_for(node));
    }
    values
}
