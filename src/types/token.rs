use std::fmt;

use serde::{Deserialize, Serialize};

use super::ast::Condition;

/// Lexical unit of rule text.
///
/// A whole `attribute comparator literal` triple is lexed as one
/// [`Token::Condition`], so the grammar only deals with parentheses,
/// connectives and conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    LParen,
    RParen,
    And,
    Or,
    Condition(Condition),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::And => f.write_str("AND"),
            Token::Or => f.write_str("OR"),
            Token::Condition(c) => write!(f, "{c}"),
        }
    }
}
