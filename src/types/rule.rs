use std::fmt;

use serde::{Deserialize, Serialize};

use super::ast::AstNode;

/// Identifier assigned to a rule by its [`RuleStore`](crate::RuleStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted rule: its source text, parsed tree and bookkeeping.
///
/// Rules are immutable once stored. A combined rule's `source_ids` lists
/// the rules it was built from, in combination order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub rule_text: String,
    pub ast: AstNode,
    pub is_combined: bool,
    pub sequence_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_ids: Vec<RuleId>,
}

/// A rule that has not been stored yet. The store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRule {
    pub rule_text: String,
    pub ast: AstNode,
    pub is_combined: bool,
    pub sequence_number: Option<u64>,
    pub source_ids: Vec<RuleId>,
}

impl NewRule {
    /// A rule authored directly from text.
    #[must_use]
    pub fn base(rule_text: impl Into<String>, ast: AstNode, sequence_number: u64) -> Self {
        Self {
            rule_text: rule_text.into(),
            ast,
            is_combined: false,
            sequence_number: Some(sequence_number),
            source_ids: Vec::new(),
        }
    }

    /// A rule produced by combining `source_ids`.
    #[must_use]
    pub fn combined(
        rule_text: impl Into<String>,
        ast: AstNode,
        sequence_number: Option<u64>,
        source_ids: Vec<RuleId>,
    ) -> Self {
        Self {
            rule_text: rule_text.into(),
            ast,
            is_combined: true,
            sequence_number,
            source_ids,
        }
    }

    pub(crate) fn into_rule(self, id: RuleId) -> Rule {
        Rule {
            id,
            rule_text: self.rule_text,
            ast: self.ast,
            is_combined: self.is_combined,
            sequence_number: self.sequence_number,
            source_ids: self.source_ids,
        }
    }
}

/// Selects rules by kind in [`RuleStore::find_all`](crate::RuleStore::find_all).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleFilter {
    /// `None` matches every rule.
    pub is_combined: Option<bool>,
}

impl RuleFilter {
    #[must_use]
    pub fn all() -> Self {
        Self { is_combined: None }
    }

    #[must_use]
    pub fn base() -> Self {
        Self {
            is_combined: Some(false),
        }
    }

    #[must_use]
    pub fn combined() -> Self {
        Self {
            is_combined: Some(true),
        }
    }

    #[must_use]
    pub fn matches(&self, rule: &Rule) -> bool {
        self.is_combined.is_none_or(|wanted| wanted == rule.is_combined)
    }
}
