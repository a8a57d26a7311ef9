use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::field::FieldNode;
use crate::ids::{FieldId, FormId, RuleId};
use crate::rule::RuleDescriptor;
use crate::tree;

/// How many superseded snapshots the undo history keeps.
pub const UNDO_CAPACITY: usize = 50;

/// A form schema snapshot. Schemas are value types: committed mutations go
/// through the `with_*` helpers, which return a new snapshot with a bumped
/// version and leave the original untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub id: FormId,
    pub name: String,
    /// Monotonically increasing, starting at 1.
    pub version: u64,
    #[serde(default)]
    pub fields: Vec<FieldNode>,
    #[serde(default)]
    pub rules: Vec<RuleDescriptor>,
}

impl FormSchema {
    /// A new empty schema at version 1.
    pub fn new(id: FormId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: 1,
            fields: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Copy-with-difference: replace the field forest, bump the version.
    pub fn with_fields(&self, fields: Vec<FieldNode>) -> Self {
        Self {
            fields,
            version: self.version + 1,
            ..self.clone()
        }
    }

    /// Copy-with-difference: replace the rule list, bump the version.
    pub fn with_rules(&self, rules: Vec<RuleDescriptor>) -> Self {
        Self {
            rules,
            version: self.version + 1,
            ..self.clone()
        }
    }

    pub fn field(&self, id: &FieldId) -> Option<&FieldNode> {
        tree::find(&self.fields, id)
    }

    pub fn rule(&self, id: &RuleId) -> Option<&RuleDescriptor> {
        self.rules.iter().find(|rule| &rule.id == id)
    }
}

/// Bounded stack of superseded schema snapshots; the oldest snapshot is
/// dropped when the capacity overflows.
#[derive(Debug, Clone)]
pub struct UndoHistory {
    snapshots: VecDeque<FormSchema>,
    capacity: usize,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::with_capacity(UNDO_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, snapshot: FormSchema) {
        if self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    /// Pop the most recent snapshot, if any.
    pub fn undo(&mut self) -> Option<FormSchema> {
        self.snapshots.pop_back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new()
    }
}
