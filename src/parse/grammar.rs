use crate::{AstNode, LogicalOp, Token};

use super::error::{SyntaxError, SyntaxErrorKind};

/// Default limit on parenthesis nesting accepted by [`parse`].
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Deepest tree (see [`AstNode::depth`]) that parsing or combining will
/// build. Long `AND`/`OR` chains nest one level per connective, and every
/// tree walk recurses once per level.
pub const MAX_TREE_DEPTH: usize = 1024;

// Grammar (AND binds tighter than OR, parentheses override both):
//
//   expr   := term (OR term)*
//   term   := factor (AND factor)*
//   factor := '(' expr ')' | condition

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    /// Consume `expected` if it is next, returning its index.
    fn eat(&mut self, expected: &Token) -> Option<usize> {
        (self.peek() == Some(expected)).then(|| {
            self.pos += 1;
            self.pos - 1
        })
    }

    fn error(&self, reason: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(self.pos, reason)
    }

    // Nodes travel with their tree depth so the bound is checked in O(1).
    fn join(
        at: usize,
        op: LogicalOp,
        (left, left_depth): (AstNode, usize),
        (right, right_depth): (AstNode, usize),
    ) -> Result<(AstNode, usize), SyntaxError> {
        let depth = left_depth.max(right_depth) + 1;
        if depth > MAX_TREE_DEPTH {
            return Err(SyntaxError::new(
                at,
                SyntaxErrorKind::ExpressionTooDeep {
                    limit: MAX_TREE_DEPTH,
                },
            ));
        }
        Ok((AstNode::operator(op, left, right), depth))
    }

    fn expr(&mut self) -> Result<(AstNode, usize), SyntaxError> {
        let mut node = self.term()?;
        while let Some(at) = self.eat(&Token::Or) {
            let rhs = self.term()?;
            node = Self::join(at, LogicalOp::Or, node, rhs)?;
        }
        Ok(node)
    }

    fn term(&mut self) -> Result<(AstNode, usize), SyntaxError> {
        let mut node = self.factor()?;
        while let Some(at) = self.eat(&Token::And) {
            let rhs = self.factor()?;
            node = Self::join(at, LogicalOp::And, node, rhs)?;
        }
        Ok(node)
    }

    fn factor(&mut self) -> Result<(AstNode, usize), SyntaxError> {
        match self.peek() {
            Some(Token::Condition(condition)) => {
                self.pos += 1;
                Ok((AstNode::Condition(condition.clone()), 1))
            }
            Some(Token::LParen) => {
                let open = self.pos;
                if self.depth >= self.max_depth {
                    return Err(self.error(SyntaxErrorKind::NestingTooDeep {
                        limit: self.max_depth,
                    }));
                }
                self.pos += 1;
                self.depth += 1;
                let inner = self.expr()?;
                self.depth -= 1;

                match self.peek() {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    None => Err(SyntaxError::new(open, SyntaxErrorKind::UnmatchedOpenParen)),
                    Some(_) => Err(self.error(SyntaxErrorKind::TrailingTokens)),
                }
            }
            Some(Token::RParen | Token::And | Token::Or) | None => {
                Err(self.error(SyntaxErrorKind::ExpectedOperand))
            }
        }
    }
}

/// Parse a token stream into an [`AstNode`], nesting at most
/// [`DEFAULT_MAX_DEPTH`] parentheses deep.
///
/// # Errors
///
/// Returns [`SyntaxError`] for empty input, unbalanced parentheses, an
/// operator without an operand, tokens left over after a complete
/// expression, or a tree deeper than [`MAX_TREE_DEPTH`].
pub fn parse(tokens: &[Token]) -> Result<AstNode, SyntaxError> {
    parse_with_limit(tokens, DEFAULT_MAX_DEPTH)
}

/// [`parse`] with an explicit parenthesis nesting limit.
///
/// # Errors
///
/// As [`parse`], plus [`SyntaxErrorKind::NestingTooDeep`] when a `(` would
/// open a level beyond `max_depth`.
pub fn parse_with_limit(tokens: &[Token], max_depth: usize) -> Result<AstNode, SyntaxError> {
    if tokens.is_empty() {
        return Err(SyntaxError::new(0, SyntaxErrorKind::EmptyExpression));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let (ast, _) = parser.expr()?;

    match parser.peek() {
        None => Ok(ast),
        Some(Token::RParen) => Err(parser.error(SyntaxErrorKind::UnmatchedCloseParen)),
        Some(_) => Err(parser.error(SyntaxErrorKind::TrailingTokens)),
    }
}
