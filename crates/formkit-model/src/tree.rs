//! Pure tree operations over the field forest.
//!
//! Every operation takes the forest by reference and returns a new forest;
//! inputs are never mutated. All operations are total: a reference to an
//! absent id is a no-op, never an error — structural integrity is the
//! validator's job, not the tree's.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::{ChoiceOption, Computation, FieldKind, FieldNode, WidthClass};
use crate::ids::{FieldId, FieldKey};

/// Placement of an inserted or moved node relative to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Before,
    After,
    /// Append as a child. Legal only when the target is a sub-table;
    /// for any other target kind this degrades to `After`.
    Inside,
}

/// Partial update merged into a single node's attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldPatch {
    #[serde(default)]
    pub key: Option<FieldKey>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub width: Option<WidthClass>,
    #[serde(default)]
    pub visible: Option<bool>,
    /// Applied only when the node is a choice kind.
    #[serde(default)]
    pub options: Option<Vec<ChoiceOption>>,
    /// Applied only when the node is a computed kind.
    #[serde(default)]
    pub computation: Option<Computation>,
}

impl FieldPatch {
    fn apply(&self, node: &mut FieldNode) {
        if let Some(key) = &self.key {
            node.key = key.clone();
        }
        if let Some(label) = &self.label {
            node.label = label.clone();
        }
        if let Some(required) = self.required {
            node.constraint.required = required;
        }
        if let Some(default_value) = &self.default_value {
            node.constraint.default_value = Some(default_value.clone());
        }
        if let Some(placeholder) = &self.placeholder {
            node.presentation.placeholder = Some(placeholder.clone());
        }
        if let Some(help_text) = &self.help_text {
            node.presentation.help_text = Some(help_text.clone());
        }
        if let Some(width) = self.width {
            node.presentation.width = width;
        }
        if let Some(visible) = self.visible {
            node.presentation.visible = visible;
        }
        if let Some(options) = &self.options {
            match &mut node.kind {
                FieldKind::SingleChoice { options: existing }
                | FieldKind::MultiChoice { options: existing } => {
                    *existing = options.clone();
                }
                _ => {}
            }
        }
        if let Some(computation) = &self.computation
            && let FieldKind::Computed {
                computation: existing,
            } = &mut node.kind
        {
            *existing = computation.clone();
        }
    }
}

/// Insert a node. With no target the node is appended to the root list;
/// otherwise it is spliced relative to the target wherever the target sits
/// in the tree. An unknown target leaves the forest unchanged.
pub fn insert(
    forest: &[FieldNode],
    node: FieldNode,
    target: Option<&FieldId>,
    position: Position,
) -> Vec<FieldNode> {
    let mut out = forest.to_vec();
    match target {
        None => out.push(node),
        Some(id) => {
            // a leftover node means the target was not found; out is still
            // an untouched copy of the input
            let _ = insert_at(&mut out, node, id, position);
        }
    }
    out
}

/// Remove the node with the given id from wherever it occurs.
pub fn delete(forest: &[FieldNode], id: &FieldId) -> Vec<FieldNode> {
    let mut out = forest.to_vec();
    remove_node(&mut out, id);
    out
}

/// Merge a partial patch into the named node, at whatever depth it is found.
pub fn update(forest: &[FieldNode], id: &FieldId, patch: &FieldPatch) -> Vec<FieldNode> {
    let mut out = forest.to_vec();
    if let Some(node) = find_mut(&mut out, id) {
        patch.apply(node);
    }
    out
}

/// Extract a subtree and reinsert it at a new location. A missing source is
/// a no-op; a target that disappears with the extracted subtree (or never
/// existed) restores the original forest.
pub fn move_field(
    forest: &[FieldNode],
    source: &FieldId,
    target: &FieldId,
    position: Position,
) -> Vec<FieldNode> {
    let mut out = forest.to_vec();
    let Some(node) = remove_node(&mut out, source) else {
        return out;
    };
    match insert_at(&mut out, node, target, position) {
        None => out,
        Some(_) => forest.to_vec(),
    }
}

/// Find a node by permanent id. Single pre-order traversal.
pub fn find<'a>(forest: &'a [FieldNode], id: &FieldId) -> Option<&'a FieldNode> {
    for node in forest {
        if &node.id == id {
            return Some(node);
        }
        if let Some(children) = node.kind.children()
            && let Some(found) = find(children, id)
        {
            return Some(found);
        }
    }
    None
}

/// Find a node by business key. Single pre-order traversal.
pub fn find_by_key<'a>(forest: &'a [FieldNode], key: &FieldKey) -> Option<&'a FieldNode> {
    for node in forest {
        if &node.key == key {
            return Some(node);
        }
        if let Some(children) = node.kind.children()
            && let Some(found) = find_by_key(children, key)
        {
            return Some(found);
        }
    }
    None
}

/// Index chain from the root list down to the node with the given id.
pub fn find_path(forest: &[FieldNode], id: &FieldId) -> Option<Vec<usize>> {
    for (index, node) in forest.iter().enumerate() {
        if &node.id == id {
            return Some(vec![index]);
        }
        if let Some(children) = node.kind.children()
            && let Some(mut rest) = find_path(children, id)
        {
            let mut path = vec![index];
            path.append(&mut rest);
            return Some(path);
        }
    }
    None
}

/// Collect every business key in the tree, pre-order.
pub fn collect_keys(forest: &[FieldNode]) -> Vec<FieldKey> {
    let mut keys = Vec::new();
    walk(forest, &mut |node| keys.push(node.key.clone()));
    keys
}

/// Pre-order visitor over the whole forest.
pub fn walk(forest: &[FieldNode], visit: &mut impl FnMut(&FieldNode)) {
    for node in forest {
        visit(node);
        if let Some(children) = node.kind.children() {
            walk(children, visit);
        }
    }
}

/// Splice `node` relative to the target at this level or below. Returns the
/// node back when no target matched, so the caller decides what a failed
/// insert means.
fn insert_at(
    nodes: &mut Vec<FieldNode>,
    node: FieldNode,
    target: &FieldId,
    position: Position,
) -> Option<FieldNode> {
    if let Some(index) = nodes.iter().position(|n| &n.id == target) {
        match position {
            Position::Before => nodes.insert(index, node),
            Position::After => nodes.insert(index + 1, node),
            Position::Inside => match nodes[index].kind.children_mut() {
                Some(children) => children.push(node),
                None => nodes.insert(index + 1, node),
            },
        }
        return None;
    }
    let mut node = node;
    for parent in nodes.iter_mut() {
        if let FieldKind::SubTable { children } = &mut parent.kind {
            match insert_at(children, node, target, position) {
                None => return None,
                Some(back) => node = back,
            }
        }
    }
    Some(node)
}

fn remove_node(nodes: &mut Vec<FieldNode>, id: &FieldId) -> Option<FieldNode> {
    if let Some(index) = nodes.iter().position(|n| &n.id == id) {
        return Some(nodes.remove(index));
    }
    for parent in nodes.iter_mut() {
        if let FieldKind::SubTable { children } = &mut parent.kind
            && let Some(found) = remove_node(children, id)
        {
            return Some(found);
        }
    }
    None
}

fn find_mut<'a>(nodes: &'a mut [FieldNode], id: &FieldId) -> Option<&'a mut FieldNode> {
    for node in nodes {
        if &node.id == id {
            return Some(node);
        }
        if let Some(children) = node.kind.children_mut()
            && let Some(found) = find_mut(children, id)
        {
            return Some(found);
        }
    }
    None
}
