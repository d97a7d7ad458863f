use thiserror::Error;

use crate::AstNode;
use crate::parse::MAX_TREE_DEPTH;

/// Fewest rules [`combine`] accepts.
pub const MIN_COMBINE_RULES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombineError {
    #[error("at least {required} rules are required to combine, got {supplied}")]
    TooFew { required: usize, supplied: usize },

    #[error("combined rule would be {depth} levels deep, the limit is {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// Fold rule trees into one tree equivalent to their conjunction.
///
/// The result is the left fold `And(And(r1, r2), r3)...`, so the same
/// inputs always give the same stored tree. Inputs are copied, never
/// shared with the output.
///
/// # Errors
///
/// Returns [`CombineError::TooFew`] for fewer than [`MIN_COMBINE_RULES`] roots
/// and [`CombineError::TooDeep`] when the fold would be deeper than
/// [`MAX_TREE_DEPTH`].
pub fn combine(roots: &[AstNode]) -> Result<AstNode, CombineError> {
    combine_at_least(roots, MIN_COMBINE_RULES)
}

/// [`combine`] with a caller-chosen minimum. A `min_count` below
/// [`MIN_COMBINE_RULES`] is raised to it.
///
/// # Errors
///
/// Returns [`CombineError::TooFew`] when `roots` is shorter than the minimum,
/// [`CombineError::TooDeep`] as for [`combine`].
pub fn combine_at_least(roots: &[AstNode], min_count: usize) -> Result<AstNode, CombineError> {
    let required = min_count.max(MIN_COMBINE_RULES);
    let too_few = || CombineError::TooFew {
        required,
        supplied: roots.len(),
    };
    if roots.len() < required {
        return Err(too_few());
    }
    let (first, rest) = roots.split_first().ok_or_else(too_few)?;

    // Each fold step adds one level above the deeper of its two operands.
    let depth = rest
        .iter()
        .fold(first.depth(), |acc, root| acc.max(root.depth()) + 1);
    if depth > MAX_TREE_DEPTH {
        return Err(CombineError::TooDeep {
            depth,
            limit: MAX_TREE_DEPTH,
        });
    }

    Ok(rest.iter().cloned().fold(first.clone(), AstNode::and))
}
