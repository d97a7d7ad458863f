use tracing::trace;

use crate::{AstNode, Condition, DataContext, LogicalOp};

/// Evaluate a rule tree against attribute data.
///
/// Never fails: a condition whose attribute is missing, or whose value and
/// literal types do not fit the comparator, is `false`. Both children of an
/// operator are always evaluated.
#[must_use]
pub fn evaluate(ast: &AstNode, ctx: &DataContext) -> bool {
    match ast {
        AstNode::Condition(condition) => evaluate_condition(condition, ctx),
        AstNode::Operator { op, left, right } => {
            let lhs = evaluate(left, ctx);
            let rhs = evaluate(right, ctx);
            match op {
                LogicalOp::And => lhs & rhs,
                LogicalOp::Or => lhs | rhs,
            }
        }
    }
}

/// Evaluate a single condition leaf.
#[must_use]
pub fn evaluate_condition(condition: &Condition, ctx: &DataContext) -> bool {
    let outcome = ctx
        .get(&condition.attribute)
        .is_some_and(|value| value.satisfies(condition.comparator, &condition.literal));
    trace!(%condition, outcome, "condition evaluated");
    outcome
}
