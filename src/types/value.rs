use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ast::{Comparator, Literal};

/// Runtime attribute value supplied in a [`DataContext`](super::DataContext).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A boolean flag.
    Bool(bool),
    /// A 64-bit floating-point number. Integers are widened on the way in.
    Number(f64),
    /// A UTF-8 string.
    Text(String),
}

impl Value {
    /// The numeric value, if this is a number.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Textual form used when the rule compares against a quoted literal.
    /// Whole numbers print without a fractional part (`35.0` becomes `35`).
    #[must_use]
    pub fn text_form(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s),
            Value::Number(n) => Cow::Owned(n.to_string()),
            Value::Bool(true) => Cow::Borrowed("true"),
            Value::Bool(false) => Cow::Borrowed("false"),
        }
    }

    /// Test this value against a condition's comparator and literal.
    ///
    /// Numbers compare numerically against numeric literals. Against a text
    /// literal only `=` is defined, matching on [`text_form`](Self::text_form).
    /// Every other combination is `false`.
    #[must_use]
    pub fn satisfies(&self, comparator: Comparator, literal: &Literal) -> bool {
        match (self, literal) {
            (_, Literal::Number(rhs)) => self
                .as_number()
                .is_some_and(|lhs| comparator.holds(lhs, *rhs)),
            (_, Literal::Text(expected)) => {
                comparator == Comparator::Eq && self.text_form() == expected.as_str()
            }
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(v) => write!(f, "\"{v}\""),
            other => f.write_str(&other.text_form()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_integers_widen() {
        assert_eq!(Value::from(42_i64), Value::Number(42.0));
        assert_eq!(Value::from(7_i32), Value::Number(7.0));
    }

    #[test]
    fn from_str() {
        assert_eq!(Value::from("hello"), Value::Text("hello".to_owned()));
    }

    #[test]
    fn text_form() {
        assert_eq!(Value::Number(35.0).text_form(), "35");
        assert_eq!(Value::Number(2.5).text_form(), "2.5");
        assert_eq!(Value::Bool(true).text_form(), "true");
        assert_eq!(Value::Text("male".into()).text_form(), "male");
    }

    #[test]
    fn display() {
        assert_eq!(Value::Number(42.0).to_string(), "42");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Text("hi".into()).to_string(), "\"hi\"");
    }

    #[test]
    fn numeric_comparisons() {
        let age = Value::Number(35.0);
        let thirty = Literal::Number(30.0);
        assert!(age.satisfies(Comparator::Gt, &thirty));
        assert!(age.satisfies(Comparator::Gte, &thirty));
        assert!(!age.satisfies(Comparator::Lt, &thirty));
        assert!(!age.satisfies(Comparator::Lte, &thirty));
        assert!(!age.satisfies(Comparator::Eq, &thirty));
        assert!(age.satisfies(Comparator::Eq, &Literal::Number(35.0)));
    }

    #[test]
    fn text_literal_only_supports_eq() {
        let gender = Value::Text("male".into());
        let male = Literal::Text("male".into());
        assert!(gender.satisfies(Comparator::Eq, &male));
        assert!(!gender.satisfies(Comparator::Gt, &male));
        assert!(!gender.satisfies(Comparator::Lte, &male));
        assert!(!gender.satisfies(Comparator::Eq, &Literal::Text("female".into())));
    }

    #[test]
    fn text_literal_matches_number_text_form() {
        let age = Value::Number(35.0);
        assert!(age.satisfies(Comparator::Eq, &Literal::Text("35".into())));
    }

    #[test]
    fn mismatched_types_are_false() {
        let text = Value::Text("35".into());
        assert_eq!(text.as_number(), None);
        assert_eq!(Value::Number(35.0).as_number(), Some(35.0));
        assert!(!text.satisfies(Comparator::Eq, &Literal::Number(35.0)));
        let flag = Value::Bool(true);
        assert!(!flag.satisfies(Comparator::Eq, &Literal::Number(1.0)));
        assert!(flag.satisfies(Comparator::Eq, &Literal::Text("true".into())));
    }

    #[test]
    fn json_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[35, 2.5, "male", true]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Number(35.0),
                Value::Number(2.5),
                Value::Text("male".into()),
                Value::Bool(true),
            ]
        );
    }
}
