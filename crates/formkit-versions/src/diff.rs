//! Structural diff between two schema snapshots.
//!
//! Fields and rules are matched by id, never by position, so a reorder with
//! no content change produces an empty diff. Sub-table columns are diffed
//! recursively; a parent table is only reported as modified when its own
//! attributes changed, not when one of its columns did.

use serde::{Deserialize, Serialize};

use formkit_model::{FieldKind, FieldNode, FormSchema, RuleDescriptor};

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTarget {
    Field,
    Rule,
}

/// One entry in a schema diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaChange {
    pub kind: ChangeKind,
    pub target: ChangeTarget,
    pub id: String,
    pub label: String,
}

/// Every field and rule change between two snapshots of the same form.
pub fn diff(old: &FormSchema, new: &FormSchema) -> Vec<SchemaChange> {
    let mut changes = Vec::new();
    diff_fields(&old.fields, &new.fields, &mut changes);
    diff_rules(&old.rules, &new.rules, &mut changes);
    changes
}

fn diff_fields(old: &[FieldNode], new: &[FieldNode], out: &mut Vec<SchemaChange>) {
    let old_by_id: BTreeMap<_, _> = old.iter().map(|node| (&node.id, node)).collect();
    let new_by_id: BTreeMap<_, _> = new.iter().map(|node| (&node.id, node)).collect();

    for (id, node) in &old_by_id {
        if !new_by_id.contains_key(*id) {
            out.push(change(ChangeKind::Removed, ChangeTarget::Field, node));
        }
    }
    for (id, node) in &new_by_id {
        match old_by_id.get(*id) {
            None => out.push(change(ChangeKind::Added, ChangeTarget::Field, node)),
            Some(previous) => {
                if shallow_changed(previous, node) {
                    out.push(change(ChangeKind::Modified, ChangeTarget::Field, node));
                }
                if let (Some(old_children), Some(new_children)) =
                    (previous.kind.children(), node.kind.children())
                {
                    diff_fields(old_children, new_children, out);
                }
            }
        }
    }
}

fn diff_rules(old: &[RuleDescriptor], new: &[RuleDescriptor], out: &mut Vec<SchemaChange>) {
    let old_by_id: BTreeMap<_, _> = old.iter().map(|rule| (&rule.id, rule)).collect();
    let new_by_id: BTreeMap<_, _> = new.iter().map(|rule| (&rule.id, rule)).collect();

    for (id, rule) in &old_by_id {
        if !new_by_id.contains_key(*id) {
            out.push(rule_change(ChangeKind::Removed, rule));
        }
    }
    for (id, rule) in &new_by_id {
        match old_by_id.get(*id) {
            None => out.push(rule_change(ChangeKind::Added, rule)),
            Some(previous) => {
                if previous != rule {
                    out.push(rule_change(ChangeKind::Modified, rule));
                }
            }
        }
    }
}

/// Compares two same-id nodes with their child forests blanked out, so child
/// edits are reported on the child alone.
fn shallow_changed(old: &FieldNode, new: &FieldNode) -> bool {
    without_children(old) != without_children(new)
}

fn without_children(node: &FieldNode) -> FieldNode {
    let mut node = node.clone();
    if let FieldKind::SubTable { children } = &mut node.kind {
        children.clear();
    }
    node
}

fn change(kind: ChangeKind, target: ChangeTarget, node: &FieldNode) -> SchemaChange {
    SchemaChange {
        kind,
        target,
        id: node.id.as_str().to_string(),
        label: node.label.clone(),
    }
}

fn rule_change(kind: ChangeKind, rule: &RuleDescriptor) -> SchemaChange {
    SchemaChange {
        kind,
        target: ChangeTarget::Rule,
        id: rule.id.as_str().to_string(),
        label: rule.name.clone(),
    }
}
