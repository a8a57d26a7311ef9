use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{FieldId, FieldKey};
use crate::rule::CompareOp;

/// Payload-free field kind discriminant, used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Date,
    SingleChoice,
    MultiChoice,
    SubTable,
    Computed,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::SingleChoice => "single_choice",
            FieldType::MultiChoice => "multi_choice",
            FieldType::SubTable => "sub_table",
            FieldType::Computed => "computed",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display categories used by editor palettes to group field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Basic,
    Choice,
    Structure,
    Logic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Field kind as an exhaustive tagged union. Children exist only on
/// `SubTable` and a computation descriptor only on `Computed`, so those
/// invariants hold by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Date,
    SingleChoice { options: Vec<ChoiceOption> },
    MultiChoice { options: Vec<ChoiceOption> },
    SubTable { children: Vec<FieldNode> },
    Computed { computation: Computation },
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::Text => FieldType::Text,
            FieldKind::Textarea => FieldType::Textarea,
            FieldKind::Number => FieldType::Number,
            FieldKind::Date => FieldType::Date,
            FieldKind::SingleChoice { .. } => FieldType::SingleChoice,
            FieldKind::MultiChoice { .. } => FieldType::MultiChoice,
            FieldKind::SubTable { .. } => FieldType::SubTable,
            FieldKind::Computed { .. } => FieldType::Computed,
        }
    }

    pub fn options(&self) -> Option<&[ChoiceOption]> {
        match self {
            FieldKind::SingleChoice { options } | FieldKind::MultiChoice { options } => {
                Some(options)
            }
            _ => None,
        }
    }

    pub fn children(&self) -> Option<&[FieldNode]> {
        match self {
            FieldKind::SubTable { children } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<FieldNode>> {
        match self {
            FieldKind::SubTable { children } => Some(children),
            _ => None,
        }
    }

    pub fn computation(&self) -> Option<&Computation> {
        match self {
            FieldKind::Computed { computation } => Some(computation),
            _ => None,
        }
    }
}

/// Data constraint block: everything validation reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataConstraint {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Regex source applied to text values. An uncompilable pattern means the
    /// check is skipped, never a hard failure.
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthClass {
    #[default]
    Full,
    Half,
    Third,
}

/// Presentation block: everything only the renderer reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub width: WidthClass,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            placeholder: None,
            help_text: None,
            width: WidthClass::Full,
            visible: true,
        }
    }
}

/// One entry in the form's field tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub id: FieldId,
    pub key: FieldKey,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub constraint: DataConstraint,
    #[serde(default)]
    pub presentation: Presentation,
}

impl FieldNode {
    pub fn new(id: FieldId, key: FieldKey, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id,
            key,
            label: label.into(),
            kind,
            constraint: DataConstraint::default(),
            presentation: Presentation::default(),
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }
}

/// Aggregate function of a computed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateFn {
    Sum,
    Avg,
    Max,
    Min,
    Count,
    Concat,
}

/// Single-condition row filter applied before aggregation.
/// `source` is a child business key within the source sub-table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputeFilter {
    pub source: String,
    pub operator: CompareOp,
    #[serde(default)]
    pub operand: Value,
}

/// Computation descriptor of a computed field.
///
/// `source` is either a direct business key or a `tableKey.childKey` path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Computation {
    pub id: String,
    pub function: AggregateFn,
    pub source: String,
    #[serde(default)]
    pub filter: Option<ComputeFilter>,
    /// Decimal places for numeric results; engine default is 2.
    #[serde(default)]
    pub precision: Option<u8>,
    /// CONCAT separator; engine default is ",".
    #[serde(default)]
    pub separator: Option<String>,
}
