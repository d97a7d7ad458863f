use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{NewRule, Rule, RuleFilter, RuleId};

use super::{RuleStore, StoreError};

/// Thread-safe in-process [`RuleStore`].
///
/// Ids and both sequence counters are `AtomicU64`s bumped with `fetch_add`,
/// so concurrent creators never observe the same number.
#[derive(Debug, Default)]
pub struct MemoryRuleStore {
    rules: RwLock<BTreeMap<RuleId, Rule>>,
    last_id: AtomicU64,
    sequence: AtomicU64,
    combined_sequence: AtomicU64,
}

/// Counter values captured alongside the rules when persisting a store.
#[cfg_attr(not(feature = "snapshot"), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Counters {
    pub(crate) last_id: u64,
    pub(crate) sequence: u64,
    pub(crate) combined_sequence: u64,
}

impl MemoryRuleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    #[cfg_attr(not(feature = "snapshot"), allow(dead_code))]
    pub(crate) fn export(&self) -> (Vec<Rule>, Counters) {
        let rules = self.rules.read();
        let counters = Counters {
            last_id: self.last_id.load(Ordering::SeqCst),
            sequence: self.sequence.load(Ordering::SeqCst),
            combined_sequence: self.combined_sequence.load(Ordering::SeqCst),
        };
        (rules.values().cloned().collect(), counters)
    }

    #[cfg_attr(not(feature = "snapshot"), allow(dead_code))]
    pub(crate) fn restore(rules: Vec<Rule>, counters: Counters) -> Self {
        Self {
            rules: RwLock::new(rules.into_iter().map(|r| (r.id, r)).collect()),
            last_id: AtomicU64::new(counters.last_id),
            sequence: AtomicU64::new(counters.sequence),
            combined_sequence: AtomicU64::new(counters.combined_sequence),
        }
    }
}

impl RuleStore for MemoryRuleStore {
    fn create(&self, rule: NewRule) -> Result<Rule, StoreError> {
        let mut rules = self.rules.write();

        if let Some(seq) = rule.sequence_number
            && rules
                .values()
                .any(|r| r.is_combined == rule.is_combined && r.sequence_number == Some(seq))
        {
            warn!(sequence_number = seq, "duplicate sequence number rejected");
            return Err(StoreError::Conflict(format!(
                "sequence number {seq} is already assigned"
            )));
        }

        let id = RuleId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1);
        let stored = rule.into_rule(id);
        rules.insert(id, stored.clone());
        debug!(rule_id = %id, "rule stored");
        Ok(stored)
    }

    fn find_all(&self, filter: RuleFilter) -> Result<Vec<Rule>, StoreError> {
        Ok(self
            .rules
            .read()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn find_by_ids(&self, ids: &[RuleId]) -> Result<Vec<Rule>, StoreError> {
        let rules = self.rules.read();
        Ok(ids.iter().filter_map(|id| rules.get(id).cloned()).collect())
    }

    fn next_sequence_number(&self) -> Result<u64, StoreError> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn next_combined_sequence_number(&self) -> Result<u64, StoreError> {
        Ok(self.combined_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }
}
