use thiserror::Error;

/// Message shown to end users for any rejected rule text.
pub const INVALID_RULE_FORMAT: &str = "Invalid rule format. Please enter a valid rule.";

/// Why a piece of rule text could not be lexed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("expected a comparator (>, <, >=, <=, =) after '{attribute}'")]
    MissingComparator { attribute: String },

    #[error("expected a number or quoted string after the comparator for '{attribute}'")]
    MissingValue { attribute: String },

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Malformed token in rule text. `position` is a byte offset into the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lex error at byte {position}: {reason}")]
pub struct LexError {
    position: usize,
    reason: LexErrorKind,
}

impl LexError {
    pub(crate) fn new(position: usize, reason: LexErrorKind) -> Self {
        Self { position, reason }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn reason(&self) -> &LexErrorKind {
        &self.reason
    }
}

/// Why a token stream does not form a rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxErrorKind {
    #[error("empty expression")]
    EmptyExpression,

    #[error("expected a condition or '('")]
    ExpectedOperand,

    #[error("'(' is never closed")]
    UnmatchedOpenParen,

    #[error("')' has no matching '('")]
    UnmatchedCloseParen,

    #[error("unexpected token after a complete expression")]
    TrailingTokens,

    #[error("parentheses nested deeper than {limit}")]
    NestingTooDeep { limit: usize },

    #[error("expression nests more than {limit} operators deep")]
    ExpressionTooDeep { limit: usize },
}

/// Grammar violation. `position` is the index of the offending token, or the
/// token count when the input ended too early.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at token {position}: {reason}")]
pub struct SyntaxError {
    position: usize,
    reason: SyntaxErrorKind,
}

impl SyntaxError {
    pub(crate) fn new(position: usize, reason: SyntaxErrorKind) -> Self {
        Self { position, reason }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn reason(&self) -> &SyntaxErrorKind {
        &self.reason
    }
}

/// Either stage of turning rule text into an AST failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

impl RuleError {
    /// The message to surface to whoever typed the rule. Diagnostics stay in
    /// `Display`.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        INVALID_RULE_FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display() {
        let err = LexError::new(4, LexErrorKind::UnterminatedString);
        assert_eq!(err.to_string(), "lex error at byte 4: unterminated string literal");
        assert_eq!(err.position(), 4);
    }

    #[test]
    fn missing_comparator_display() {
        let err = LexError::new(
            3,
            LexErrorKind::MissingComparator {
                attribute: "age".into(),
            },
        );
        assert_eq!(
            err.to_string(),
            "lex error at byte 3: expected a comparator (>, <, >=, <=, =) after 'age'"
        );
    }

    #[test]
    fn syntax_error_display() {
        let err = SyntaxError::new(2, SyntaxErrorKind::NestingTooDeep { limit: 8 });
        assert_eq!(
            err.to_string(),
            "syntax error at token 2: parentheses nested deeper than 8"
        );
        assert_eq!(err.reason(), &SyntaxErrorKind::NestingTooDeep { limit: 8 });
    }

    #[test]
    fn rule_error_is_transparent() {
        let err: RuleError = SyntaxError::new(0, SyntaxErrorKind::EmptyExpression).into();
        assert_eq!(err.to_string(), "syntax error at token 0: empty expression");
        assert_eq!(err.user_message(), INVALID_RULE_FORMAT);
    }
}
