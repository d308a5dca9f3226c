//! Transaction lifecycle states.

use std::fmt;

/// Lifecycle state of a [`Transaction`](crate::Transaction).
///
/// A transaction moves `Building → Submitted` exactly once, then settles in
/// one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Conditions and operations may be added.
    Building,
    /// The atomic unit is in flight.
    Submitted,
    /// Every condition held and every command ran.
    Committed,
    /// A condition did not hold; no command ran.
    Aborted,
    /// The round trip failed; the store's state is unknown.
    Failed,
}

impl TransactionState {
    /// Returns true while conditions and operations may be added.
    pub fn accepts_changes(&self) -> bool {
        matches!(self, TransactionState::Building)
    }

    /// Returns true once the transaction can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Committed | TransactionState::Aborted | TransactionState::Failed
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionState::Building => "building",
            TransactionState::Submitted => "submitted",
            TransactionState::Committed => "committed",
            TransactionState::Aborted => "aborted",
            TransactionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_predicates() {
        assert!(TransactionState::Building.accepts_changes());
        assert!(!TransactionState::Submitted.accepts_changes());
        assert!(!TransactionState::Submitted.is_terminal());
        assert!(TransactionState::Aborted.is_terminal());
        assert!(TransactionState::Failed.is_terminal());
    }

    #[test]
    fn state_display() {
        assert_eq!(TransactionState::Committed.to_string(), "committed");
        assert_eq!(TransactionState::Building.to_string(), "building");
    }
}
