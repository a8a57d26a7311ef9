//! Rule engine: evaluates first-order condition/action rules against live
//! form data.
//!
//! Evaluation order is a deterministic total order, not input order: all
//! set-value rules run first, then required, then visibility, so a value
//! written by a set-value rule is visible to the required/visibility rules
//! of the same pass. Within a kind, input order is preserved.
//!
//! A rule whose source cannot be resolved never aborts the pass — it is
//! logged and treated as "did not fire".

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use formkit_model::{
    FieldId, FieldKind, FieldNode, FormData, RuleDescriptor, RuleId, RuleKind, resolve_path,
};

/// Live data plus the id-to-path map the engine resolves sources through.
///
/// Paths for top-level fields are their business key; sub-table children use
/// `tableKey.childKey`, which resolves to the child column across all rows.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub data: &'a FormData,
    pub paths: &'a BTreeMap<FieldId, String>,
}

/// Result of one evaluation pass. Maps only contain entries for fields some
/// rule actually fired on; absent entries mean "schema default applies".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub visibility: BTreeMap<FieldId, bool>,
    pub required: BTreeMap<FieldId, bool>,
    pub set_value: BTreeMap<FieldId, Value>,
    pub triggered: Vec<RuleId>,
}

/// Build the id-to-path map for a field forest.
pub fn data_paths(forest: &[FieldNode]) -> BTreeMap<FieldId, String> {
    let mut paths = BTreeMap::new();
    for node in forest {
        paths.insert(node.id.clone(), node.key.as_str().to_string());
        if let FieldKind::SubTable { children } = &node.kind {
            for child in children {
                paths.insert(child.id.clone(), format!("{}.{}", node.key, child.key));
            }
        }
    }
    paths
}

/// Evaluate every rule once against the context.
pub fn evaluate(rules: &[RuleDescriptor], ctx: &EvaluationContext<'_>) -> RuleOutcome {
    let mut ordered: Vec<&RuleDescriptor> = rules.iter().collect();
    ordered.sort_by_key(|rule| kind_rank(rule.kind));

    // set-value writes are applied to this scratch copy so later rules in
    // the same pass observe them
    let mut scratch = ctx.data.clone();
    let mut outcome = RuleOutcome::default();

    for rule in ordered {
        let fired = match condition_holds(rule, &scratch, ctx.paths) {
            Some(fired) => fired,
            None => {
                debug!(rule = %rule.id, "rule source unresolvable, treated as not fired");
                continue;
            }
        };
        if !fired {
            continue;
        }
        outcome.triggered.push(rule.id.clone());
        let target = rule.action.target.clone();
        match rule.kind {
            RuleKind::SetValue => {
                apply_set_value(&mut scratch, ctx.paths, &target, &rule.action.payload);
                outcome.set_value.insert(target, rule.action.payload.clone());
            }
            RuleKind::Required => {
                outcome
                    .required
                    .insert(target, rule.action.payload.as_bool().unwrap_or(true));
            }
            RuleKind::Visibility => {
                outcome
                    .visibility
                    .insert(target, rule.action.payload.as_bool().unwrap_or(true));
            }
        }
    }
    outcome
}

/// SetValue < Required < Visibility.
fn kind_rank(kind: RuleKind) -> u8 {
    match kind {
        RuleKind::SetValue => 0,
        RuleKind::Required => 1,
        RuleKind::Visibility => 2,
    }
}

/// `None` means the source was unresolvable and the rule must be skipped.
/// Emptiness operators still fire on missing data: absent resolves to null.
fn condition_holds(
    rule: &RuleDescriptor,
    data: &FormData,
    paths: &BTreeMap<FieldId, String>,
) -> Option<bool> {
    let path = paths.get(&rule.condition.source)?;
    let operator = rule.condition.operator;
    let actual = match resolve_path(data, path) {
        Some(value) => value,
        None if !operator.needs_operand() => Value::Null,
        None => return None,
    };
    Some(operator.compare(&actual, &rule.condition.operand))
}

fn apply_set_value(
    scratch: &mut FormData,
    paths: &BTreeMap<FieldId, String>,
    target: &FieldId,
    payload: &Value,
) {
    let Some(path) = paths.get(target) else {
        debug!(target = %target, "set-value target has no data path");
        return;
    };
    if path.contains('.') {
        // sub-table internals are row-addressed by the data engine; the
        // outcome map still records the payload for the host to apply
        debug!(path, "set-value into a sub-table path is row-addressed, skipped in scratch");
        return;
    }
    scratch.insert(path.clone(), payload.clone());
}
