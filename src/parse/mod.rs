mod error;
mod grammar;
mod lexer;

pub use error::{
    INVALID_RULE_FORMAT, LexError, LexErrorKind, RuleError, SyntaxError, SyntaxErrorKind,
};
pub use grammar::{DEFAULT_MAX_DEPTH, MAX_TREE_DEPTH, parse, parse_with_limit};
pub use lexer::tokenize;

use crate::AstNode;

/// Tokenize and parse rule text in one step.
///
/// # Errors
///
/// Returns [`RuleError`] if the text fails either stage.
pub fn parse_rule(text: &str) -> Result<AstNode, RuleError> {
    parse_rule_with_limit(text, DEFAULT_MAX_DEPTH)
}

/// [`parse_rule`] with an explicit parenthesis nesting limit.
///
/// # Errors
///
/// Returns [`RuleError`] if the text fails either stage.
pub fn parse_rule_with_limit(text: &str, max_depth: usize) -> Result<AstNode, RuleError> {
    let tokens = tokenize(text)?;
    let ast = parse_with_limit(&tokens, max_depth)?;
    Ok(ast)
}
