//! Persistence seam for [`Rule`]s.
//!
//! The engine only talks to storage through [`RuleStore`]. Sequence numbers
//! come from the store's atomic allocators, never from reading the current
//! maximum and adding one.

mod memory;

use std::sync::Arc;

use thiserror::Error;

use crate::{NewRule, Rule, RuleFilter, RuleId};

pub use memory::MemoryRuleStore;
#[cfg(feature = "snapshot")]
pub(crate) use memory::Counters;

/// Failures reported by a [`RuleStore`]. The engine passes them through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("rule store unavailable: {0}")]
    Unavailable(String),

    #[error("rule store conflict: {0}")]
    Conflict(String),

    #[error("rule store data is corrupt: {0}")]
    Corrupt(String),
}

/// Storage for rules and the allocator of their sequence numbers.
pub trait RuleStore: Send + Sync {
    /// Persist a rule and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the sequence number is already
    /// taken by a rule of the same kind.
    fn create(&self, rule: NewRule) -> Result<Rule, StoreError>;

    /// All rules matching `filter`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be read.
    fn find_all(&self, filter: RuleFilter) -> Result<Vec<Rule>, StoreError>;

    /// Rules with the given ids, in the order requested. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backing storage cannot be read.
    fn find_by_ids(&self, ids: &[RuleId]) -> Result<Vec<Rule>, StoreError>;

    /// Atomically allocate the next sequence number for a base rule, starting at 1.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the counter cannot be incremented.
    fn next_sequence_number(&self) -> Result<u64, StoreError>;

    /// Atomically allocate the next sequence number for a combined rule.
    /// Independent of [`next_sequence_number`](Self::next_sequence_number).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the counter cannot be incremented.
    fn next_combined_sequence_number(&self) -> Result<u64, StoreError>;
}

impl<S: RuleStore + ?Sized> RuleStore for Arc<S> {
    fn create(&self, rule: NewRule) -> Result<Rule, StoreError> {
        (**self).create(rule)
    }

    fn find_all(&self, filter: RuleFilter) -> Result<Vec<Rule>, StoreError> {
        (**self).find_all(filter)
    }

    fn find_by_ids(&self, ids: &[RuleId]) -> Result<Vec<Rule>, StoreError> {
        (**self).find_by_ids(ids)
    }

    fn next_sequence_number(&self) -> Result<u64, StoreError> {
        (**self).next_sequence_number()
    }

    fn next_combined_sequence_number(&self) -> Result<u64, StoreError> {
        (**self).next_combined_sequence_number()
    }
}
