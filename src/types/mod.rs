mod ast;
mod context;
mod rule;
mod token;
mod value;

pub use ast::{AstNode, AttrExpr, Comparator, Condition, Literal, LogicalOp, attr};
pub use context::{ContextError, DataContext};
pub use rule::{NewRule, Rule, RuleFilter, RuleId};
pub use token::Token;
pub use value::Value;
