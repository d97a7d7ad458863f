use thiserror::Error;

use crate::combine::CombineError;
use crate::parse::RuleError;
use crate::store::StoreError;
use crate::{ContextError, RuleId};

/// Unified error type for [`RuleEngine`](crate::RuleEngine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("unknown rule id {0}")]
    UnknownRule(RuleId),

    #[error("rule text is {length} bytes, the limit is {limit}")]
    RuleTooLong { length: usize, limit: usize },

    #[error("combined rule text nests parentheses {depth} deep, the limit is {limit}")]
    CombinedNestingTooDeep { depth: usize, limit: usize },
}

impl EngineError {
    /// `true` when the caller sent something unusable, `false` when the
    /// store failed. Hosts map the former to a client error status.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        !matches!(self, EngineError::Store(_))
    }
}
