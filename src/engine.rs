use tracing::{debug, info, instrument, warn};

use crate::combine::combine_at_least;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::evaluate::evaluate;
use crate::parse::parse_rule_with_limit;
use crate::store::RuleStore;
use crate::{DataContext, NewRule, Rule, RuleFilter, RuleId};

/// Host-facing rule service: authoring, listing, combining and evaluating
/// rules held in a [`RuleStore`].
///
/// All methods take `&self`; share one engine across threads behind `Arc`.
///
/// # Example
///
/// ```
/// use rulekit::{DataContext, MemoryRuleStore, RuleEngine};
///
/// let engine = RuleEngine::new(MemoryRuleStore::new());
/// let a = engine.create_rule("age > 30 AND department = 'Sales'").unwrap();
/// let b = engine.create_rule("salary > 50000 OR experience > 5").unwrap();
/// engine.combine_rules(&[a.id, b.id]).unwrap();
///
/// let ctx = DataContext::new()
///     .set("age", 35)
///     .set("department", "Sales")
///     .set("salary", 60000);
/// assert!(engine.evaluate(&ctx).unwrap());
/// ```
#[derive(Debug)]
pub struct RuleEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: RuleStore> RuleEngine<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Consume the engine and hand back its store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Parse `rule_text` and store it as a new base rule with the next
    /// sequence number.
    ///
    /// # Errors
    ///
    /// [`EngineError::RuleTooLong`] or [`EngineError::Rule`] for unusable
    /// text; [`EngineError::Store`] if persisting fails.
    #[instrument(skip(self, rule_text), fields(length = rule_text.len()))]
    pub fn create_rule(&self, rule_text: &str) -> Result<Rule, EngineError> {
        let limit = self.config.max_rule_length;
        if rule_text.len() > limit {
            warn!(limit, "rule text too long");
            return Err(EngineError::RuleTooLong {
                length: rule_text.len(),
                limit,
            });
        }

        let ast = parse_rule_with_limit(rule_text, self.config.max_nesting_depth)
            .inspect_err(|err| warn!(error = %err, "rejected rule text"))?;

        let sequence_number = self.store.next_sequence_number()?;
        let rule = self
            .store
            .create(NewRule::base(rule_text, ast, sequence_number))?;
        info!(rule_id = %rule.id, sequence_number, "rule created");
        Ok(rule)
    }

    /// All base (non-combined) rules.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the store cannot be read.
    pub fn rules(&self) -> Result<Vec<Rule>, EngineError> {
        Ok(self.store.find_all(RuleFilter::base())?)
    }

    /// All combined rules.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the store cannot be read.
    pub fn combined_rules(&self) -> Result<Vec<Rule>, EngineError> {
        Ok(self.store.find_all(RuleFilter::combined())?)
    }

    /// Combine stored rules, in the order given, into a new combined rule.
    ///
    /// Repeated ids count once. The stored text is the canonical text of the
    /// combined tree, which re-parses to the same tree.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownRule`] if an id is not stored,
    /// [`EngineError::Combine`] if fewer than the configured minimum of
    /// distinct rules remain or the result is too deep,
    /// [`EngineError::CombinedNestingTooDeep`] if the stored text would need
    /// more parentheses than `max_nesting_depth`, [`EngineError::Store`] on
    /// storage failure.
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub fn combine_rules(&self, ids: &[RuleId]) -> Result<Rule, EngineError> {
        let mut unique: Vec<RuleId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        let found = self.store.find_by_ids(&unique)?;
        if let Some(missing) = unique.iter().find(|id| !found.iter().any(|r| r.id == **id)) {
            warn!(rule_id = %missing, "combine requested an unknown rule");
            return Err(EngineError::UnknownRule(*missing));
        }

        let (source_ids, roots): (Vec<RuleId>, Vec<_>) =
            found.into_iter().map(|rule| (rule.id, rule.ast)).unzip();
        let ast = combine_at_least(&roots, self.config.min_combine_rules)?;

        // Wrapping a top-level OR adds a level, so the stored text must be
        // checked against the same limit authored text is.
        let depth = ast.paren_depth();
        let limit = self.config.max_nesting_depth;
        if depth > limit {
            warn!(depth, limit, "combined rule text nests too deep");
            return Err(EngineError::CombinedNestingTooDeep { depth, limit });
        }
        let rule_text = ast.to_string();

        let sequence_number = self.store.next_combined_sequence_number()?;
        let rule = self.store.create(NewRule::combined(
            rule_text,
            ast,
            Some(sequence_number),
            source_ids,
        ))?;
        info!(
            rule_id = %rule.id,
            sources = rule.source_ids.len(),
            sequence_number,
            "combined rule created"
        );
        Ok(rule)
    }

    /// Whether `ctx` satisfies any stored combined rule. `false` when there
    /// are none.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the store cannot be read.
    #[instrument(skip_all)]
    pub fn evaluate(&self, ctx: &DataContext) -> Result<bool, EngineError> {
        let combined = self.store.find_all(RuleFilter::combined())?;
        let matched = combined.iter().find(|rule| evaluate(&rule.ast, ctx));
        debug!(
            candidates = combined.len(),
            matched = ?matched.map(|rule| rule.id),
            "evaluated combined rules"
        );
        Ok(matched.is_some())
    }

    /// Decode a JSON object of attributes and [`evaluate`](Self::evaluate) it.
    ///
    /// # Errors
    ///
    /// [`EngineError::Context`] if `json` is not a JSON object, otherwise as
    /// [`evaluate`](Self::evaluate).
    pub fn evaluate_json(&self, json: &str) -> Result<bool, EngineError> {
        let ctx = DataContext::from_json(json)
            .inspect_err(|err| warn!(error = %err, "rejected evaluation data"))?;
        self.evaluate(&ctx)
    }

    /// Evaluate a single stored rule, base or combined.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownRule`] if `id` is not stored,
    /// [`EngineError::Store`] on storage failure.
    pub fn evaluate_rule(&self, id: RuleId, ctx: &DataContext) -> Result<bool, EngineError> {
        let rule = self
            .store
            .find_by_ids(&[id])?
            .into_iter()
            .next()
            .ok_or(EngineError::UnknownRule(id))?;
        Ok(evaluate(&rule.ast, ctx))
    }
}
