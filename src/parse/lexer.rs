use tracing::trace;
use winnow::ascii::digit1;
use winnow::combinator::{alt, delimited, opt};
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

use crate::{Comparator, Condition, Literal, Token};

use super::error::{LexError, LexErrorKind};

// -- Character classes --------------------------------------------------------

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

// -- Primitives ---------------------------------------------------------------

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1, is_ident_start),
        take_while(0.., is_ident_continue),
    )
        .take()
        .parse_next(input)
}

// Longest match first so `>=` is never split into `>` and `=`.
fn comparator(input: &mut &str) -> ModalResult<Comparator> {
    alt((
        ">=".value(Comparator::Gte),
        "<=".value(Comparator::Lte),
        ">".value(Comparator::Gt),
        "<".value(Comparator::Lt),
        "=".value(Comparator::Eq),
    ))
    .parse_next(input)
}

fn number<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (opt('-'), digit1, opt(('.', digit1)))
        .take()
        .parse_next(input)
}

fn quoted<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    delimited('\'', take_till(0.., '\''), '\'').parse_next(input)
}

// -- Token assembly -----------------------------------------------------------

fn offset(text: &str, rest: &str) -> usize {
    text.len() - rest.len()
}

fn literal(input: &mut &str, attribute: &str) -> Result<Literal, LexErrorKind> {
    if input.starts_with('\'') {
        return quoted
            .parse_next(input)
            .map(|s| Literal::Text(s.to_owned()))
            .map_err(|_| LexErrorKind::UnterminatedString);
    }

    let digits = number
        .parse_next(input)
        .map_err(|_| LexErrorKind::MissingValue {
            attribute: attribute.to_owned(),
        })?;

    if input.starts_with(is_ident_continue) {
        let tail = input
            .find(|c: char| !is_ident_continue(c))
            .unwrap_or(input.len());
        return Err(LexErrorKind::InvalidNumber(format!("{digits}{}", &input[..tail])));
    }

    // Out-of-range values parse to infinity, which has no rule text form.
    match digits.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Literal::Number(n)),
        _ => Err(LexErrorKind::InvalidNumber(digits.to_owned())),
    }
}

/// Lex a word: either a connective keyword or the start of a condition.
fn word(text: &str, input: &mut &str) -> Result<Token, LexError> {
    let start = offset(text, input);
    let name = ident.parse_next(input).map_err(|_| {
        let found = text[start..].chars().next().unwrap_or(' ');
        LexError::new(start, LexErrorKind::UnexpectedChar(found))
    })?;

    match name {
        "AND" => return Ok(Token::And),
        "OR" => return Ok(Token::Or),
        _ => {}
    }

    *input = input.trim_start();
    let comparator = comparator.parse_next(input).map_err(|_| {
        LexError::new(
            offset(text, input),
            LexErrorKind::MissingComparator {
                attribute: name.to_owned(),
            },
        )
    })?;

    *input = input.trim_start();
    let value_start = offset(text, input);
    let literal = literal(input, name).map_err(|reason| LexError::new(value_start, reason))?;

    Ok(Token::Condition(Condition {
        attribute: name.to_owned(),
        comparator,
        literal,
    }))
}

/// Split rule text into [`Token`]s.
///
/// Whitespace between tokens is skipped. `AND` and `OR` are keywords only
/// as whole words; `ANDROID` is an ordinary attribute name.
///
/// # Errors
///
/// Returns [`LexError`] when a condition is not of the form
/// `identifier comparator value`, a quoted literal is never closed, or a
/// character that cannot start any token is found.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    let mut input = text;
    let mut tokens = Vec::new();

    loop {
        input = input.trim_start();
        let Some(next) = input.chars().next() else {
            break;
        };

        let token = match next {
            '(' => {
                input = &input[1..];
                Token::LParen
            }
            ')' => {
                input = &input[1..];
                Token::RParen
            }
            c if is_ident_start(c) => word(text, &mut input)?,
            c => {
                return Err(LexError::new(
                    offset(text, input),
                    LexErrorKind::UnexpectedChar(c),
                ));
            }
        };
        tokens.push(token);
    }

    trace!(tokens = tokens.len(), "tokenized rule text");
    Ok(tokens)
}
