use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison operators supported in rule conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "=")]
    Eq,
}

impl Comparator {
    /// The operator as it appears in rule text.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Gte => ">=",
            Comparator::Lte => "<=",
            Comparator::Eq => "=",
        }
    }

    /// Apply the comparator to two numbers. `Eq` is exact equality, and any
    /// comparison involving NaN is false.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparator::Gt => lhs > rhs,
            Comparator::Lt => lhs < rhs,
            Comparator::Gte => lhs >= rhs,
            Comparator::Lte => lhs <= rhs,
            Comparator::Eq => lhs == rhs,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The right-hand side of a condition, typed once when the rule text is lexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// A numeric literal such as `30` or `-2.5`.
    Number(f64),
    /// A single-quoted literal, stored without its quotes.
    Text(String),
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Number(v)
    }
}

impl From<i64> for Literal {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Literal::Number(v as f64)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Number(f64::from(v))
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Text(v.to_owned())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Text(v)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(v) => write!(f, "{v}"),
            Literal::Text(v) => write!(f, "'{v}'"),
        }
    }
}

/// A single `attribute comparator literal` test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub comparator: Comparator,
    pub literal: Literal,
}

impl Condition {
    #[must_use]
    pub fn new(
        attribute: impl Into<String>,
        comparator: Comparator,
        literal: impl Into<Literal>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            comparator,
            literal: literal.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.comparator, self.literal)
    }
}

/// Boolean connective of an operator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicalOp {
    /// Binding strength: `AND` binds tighter than `OR`.
    fn precedence(self) -> u8 {
        match self {
            LogicalOp::Or => 1,
            LogicalOp::And => 2,
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => f.write_str("AND"),
            LogicalOp::Or => f.write_str("OR"),
        }
    }
}

/// Parsed form of a rule.
///
/// Leaves are always [`Condition`]s and every operator owns exactly two
/// children, so a tree is finite and never shares subtrees.
///
/// `Display` renders canonical rule text with the fewest parentheses that
/// still reproduce the same tree when parsed again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AstNode {
    Condition(Condition),
    Operator {
        op: LogicalOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
}

impl AstNode {
    #[must_use]
    pub fn operator(op: LogicalOp, left: AstNode, right: AstNode) -> AstNode {
        AstNode::Operator {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn and(self, other: AstNode) -> AstNode {
        AstNode::operator(LogicalOp::And, self, other)
    }

    #[must_use]
    pub fn or(self, other: AstNode) -> AstNode {
        AstNode::operator(LogicalOp::Or, self, other)
    }

    /// Number of nodes on the longest root-to-leaf path. A lone condition has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            AstNode::Condition(_) => 1,
            AstNode::Operator { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    /// Deepest parenthesis nesting in the canonical text (`Display`).
    #[must_use]
    pub fn paren_depth(&self) -> usize {
        match self {
            AstNode::Condition(_) => 0,
            AstNode::Operator { op, left, right } => {
                let side = |node: &AstNode, is_right: bool| {
                    node.paren_depth() + usize::from(needs_parens(node, *op, is_right))
                };
                side(left, false).max(side(right, true))
            }
        }
    }

    /// Number of condition leaves.
    #[must_use]
    pub fn condition_count(&self) -> usize {
        match self {
            AstNode::Condition(_) => 1,
            AstNode::Operator { left, right, .. } => {
                left.condition_count() + right.condition_count()
            }
        }
    }

    /// Distinct attribute names referenced anywhere in the tree, sorted.
    #[must_use]
    pub fn attributes(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        collect_attributes(self, &mut out);
        out
    }
}

fn collect_attributes<'a>(node: &'a AstNode, out: &mut BTreeSet<&'a str>) {
    match node {
        AstNode::Condition(c) => {
            out.insert(c.attribute.as_str());
        }
        AstNode::Operator { left, right, .. } => {
            collect_attributes(left, out);
            collect_attributes(right, out);
        }
    }
}

impl From<Condition> for AstNode {
    fn from(c: Condition) -> Self {
        AstNode::Condition(c)
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Condition(c) => write!(f, "{c}"),
            AstNode::Operator { op, left, right } => {
                write_operand(f, left, *op, false)?;
                write!(f, " {op} ")?;
                write_operand(f, right, *op, true)
            }
        }
    }
}

// Operators parse left-associatively, so a right child at the same
// precedence only survives a round trip inside parentheses.
fn needs_parens(node: &AstNode, parent: LogicalOp, is_right: bool) -> bool {
    match node {
        AstNode::Condition(_) => false,
        AstNode::Operator { op, .. } => {
            op.precedence() < parent.precedence()
                || (is_right && op.precedence() == parent.precedence())
        }
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    node: &AstNode,
    parent: LogicalOp,
    is_right: bool,
) -> fmt::Result {
    if needs_parens(node, parent, is_right) {
        write!(f, "({node})")
    } else {
        write!(f, "{node}")
    }
}

/// Intermediate builder for condition leaves.
/// Created by [`attr()`]; requires a comparison method to produce an [`AstNode`].
#[derive(Debug, Clone)]
pub struct AttrExpr {
    attribute: String,
}

impl AttrExpr {
    fn compare(self, comparator: Comparator, literal: impl Into<Literal>) -> AstNode {
        AstNode::Condition(Condition {
            attribute: self.attribute,
            comparator,
            literal: literal.into(),
        })
    }

    #[must_use]
    pub fn eq(self, literal: impl Into<Literal>) -> AstNode {
        self.compare(Comparator::Eq, literal)
    }

    #[must_use]
    pub fn gt(self, literal: impl Into<Literal>) -> AstNode {
        self.compare(Comparator::Gt, literal)
    }

    #[must_use]
    pub fn gte(self, literal: impl Into<Literal>) -> AstNode {
        self.compare(Comparator::Gte, literal)
    }

    #[must_use]
    pub fn lt(self, literal: impl Into<Literal>) -> AstNode {
        self.compare(Comparator::Lt, literal)
    }

    #[must_use]
    pub fn lte(self, literal: impl Into<Literal>) -> AstNode {
        self.compare(Comparator::Lte, literal)
    }
}

#[must_use]
pub fn attr(name: &str) -> AttrExpr {
    AttrExpr {
        attribute: name.to_owned(),
    }
}
