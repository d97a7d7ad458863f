mod combine;
mod config;
mod engine;
mod error;
mod evaluate;
mod parse;
#[cfg(feature = "snapshot")]
mod snapshot;
mod store;
mod types;

pub use combine::{CombineError, MIN_COMBINE_RULES, combine, combine_at_least};
pub use config::{ConfigError, EngineConfig};
pub use engine::RuleEngine;
pub use error::EngineError;
pub use evaluate::{evaluate, evaluate_condition};
pub use parse::{
    DEFAULT_MAX_DEPTH, INVALID_RULE_FORMAT, LexError, LexErrorKind, MAX_TREE_DEPTH, RuleError,
    SyntaxError, SyntaxErrorKind, parse, parse_rule, parse_rule_with_limit, parse_with_limit, tokenize,
};
#[cfg(feature = "snapshot")]
pub use snapshot::SnapshotError;
pub use store::{MemoryRuleStore, RuleStore, StoreError};
pub use types::{
    AstNode, AttrExpr, Comparator, Condition, ContextError, DataContext, Literal, LogicalOp,
    NewRule, Rule, RuleFilter, RuleId, Token, Value, attr,
};
