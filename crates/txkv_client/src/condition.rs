//! Read-only handles onto conditions added to a transaction.

use std::fmt;
use std::sync::{Arc, OnceLock};
use txkv_protocol::Condition;

/// Handle returned by [`Transaction::add_condition`](crate::Transaction::add_condition).
///
/// `was_satisfied` is unset until the transaction's round trip completes,
/// then set exactly once to whether the predicate held when the unit ran.
#[derive(Clone)]
pub struct ConditionHandle {
    condition: Arc<Condition>,
    satisfied: Arc<OnceLock<bool>>,
}

impl ConditionHandle {
    pub(crate) fn new(condition: Condition) -> Self {
        Self {
            condition: Arc::new(condition),
            satisfied: Arc::new(OnceLock::new()),
        }
    }

    /// Returns the condition.
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Returns whether the condition held, or `None` before a reply arrived.
    ///
    /// Stays `None` forever if the round trip failed.
    pub fn was_satisfied(&self) -> Option<bool> {
        self.satisfied.get().copied()
    }

    pub(crate) fn record(&self, satisfied: bool) {
        // A second write is ignored.
        let _ = self.satisfied.set(satisfied);
    }
}

impl fmt::Debug for ConditionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionHandle")
            .field("kind", &self.condition.kind())
            .field("key", &self.condition.key().to_string())
            .field("was_satisfied", &self.was_satisfied())
            .finish()
    }
}
