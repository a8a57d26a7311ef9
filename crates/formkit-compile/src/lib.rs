//! Schema compiler: derives a render-ready artifact from a form schema.
//!
//! The compiled artifact is a value snapshot — render nodes carry only the
//! presentation-relevant attributes, and the lookup maps hold copies of the
//! source nodes, so handing the artifact to a presentation layer can never
//! alias mutable schema state. Recompile whenever the schema snapshot
//! changes; the artifact is never patched in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use formkit_model::{
    ChoiceOption, Computation, FieldId, FieldKey, FieldNode, FieldType, FormId, FormSchema,
    WidthClass,
};

/// One render node per field, same shape as the field tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub id: FieldId,
    pub key: FieldKey,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub placeholder: Option<String>,
    pub help_text: Option<String>,
    pub width: WidthClass,
    pub visible: bool,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub computation: Option<Computation>,
    #[serde(default)]
    pub children: Vec<RenderNode>,
}

/// Compiler output: the render tree plus flat lookup indices built in a
/// single pre-order traversal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledForm {
    pub form_id: FormId,
    pub name: String,
    pub version: u64,
    pub nodes: Vec<RenderNode>,
    pub by_id: BTreeMap<FieldId, FieldNode>,
    pub by_key: BTreeMap<FieldKey, FieldNode>,
}

impl CompiledForm {
    pub fn field_by_id(&self, id: &FieldId) -> Option<&FieldNode> {
        self.by_id.get(id)
    }

    pub fn field_by_key(&self, key: &FieldKey) -> Option<&FieldNode> {
        self.by_key.get(key)
    }

    /// Pre-order list of render nodes; import/export collaborators consume
    /// this as the flat field list.
    pub fn flatten(&self) -> Vec<&RenderNode> {
        let mut out = Vec::new();
        fn push<'a>(nodes: &'a [RenderNode], out: &mut Vec<&'a RenderNode>) {
            for node in nodes {
                out.push(node);
                push(&node.children, out);
            }
        }
        push(&self.nodes, &mut out);
        out
    }
}

/// Compile a schema snapshot into its render artifact.
pub fn compile(schema: &FormSchema) -> CompiledForm {
    let mut by_id = BTreeMap::new();
    let mut by_key = BTreeMap::new();
    let nodes = schema
        .fields
        .iter()
        .map(|field| compile_node(field, &mut by_id, &mut by_key))
        .collect();
    CompiledForm {
        form_id: schema.id.clone(),
        name: schema.name.clone(),
        version: schema.version,
        nodes,
        by_id,
        by_key,
    }
}

fn compile_node(
    node: &FieldNode,
    by_id: &mut BTreeMap<FieldId, FieldNode>,
    by_key: &mut BTreeMap<FieldKey, FieldNode>,
) -> RenderNode {
    by_id.insert(node.id.clone(), node.clone());
    by_key.insert(node.key.clone(), node.clone());
    let children = node
        .kind
        .children()
        .map(|children| {
            children
                .iter()
                .map(|child| compile_node(child, by_id, by_key))
                .collect()
        })
        .unwrap_or_default();
    RenderNode {
        id: node.id.clone(),
        key: node.key.clone(),
        label: node.label.clone(),
        field_type: node.field_type(),
        required: node.constraint.required,
        placeholder: node.presentation.placeholder.clone(),
        help_text: node.presentation.help_text.clone(),
        width: node.presentation.width,
        visible: node.presentation.visible,
        options: node.kind.options().map(<[ChoiceOption]>::to_vec).unwrap_or_default(),
        computation: node.kind.computation().cloned(),
        children,
    }
}
