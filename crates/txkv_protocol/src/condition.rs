//! Preconditions gating an atomic unit.

use crate::error::{ProtocolError, ProtocolResult};
use crate::value::{Comparand, Key};
use serde::{Deserialize, Serialize};

/// The kind of predicate a [`Condition`] expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    /// The key exists (any type).
    KeyExists,
    /// The key does not exist.
    KeyNotExists,
    /// The string at the key equals the comparand.
    StringEqual,
    /// The string at the key differs from the comparand.
    StringNotEqual,
    /// The hash at the key has the field.
    HashFieldExists,
    /// The hash at the key does not have the field.
    HashFieldNotExists,
    /// The hash field equals the comparand.
    HashFieldEqual,
    /// The hash field differs from the comparand.
    HashFieldNotEqual,
}

impl ConditionKind {
    /// Returns true if the kind targets a hash field.
    #[must_use]
    pub fn is_hash_scoped(&self) -> bool {
        matches!(
            self,
            ConditionKind::HashFieldExists
                | ConditionKind::HashFieldNotExists
                | ConditionKind::HashFieldEqual
                | ConditionKind::HashFieldNotEqual
        )
    }

    /// Returns true if the kind compares against a value.
    #[must_use]
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            ConditionKind::StringEqual
                | ConditionKind::StringNotEqual
                | ConditionKind::HashFieldEqual
                | ConditionKind::HashFieldNotEqual
        )
    }

    /// Returns true if the kind is the negation of its positive counterpart.
    #[must_use]
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            ConditionKind::KeyNotExists
                | ConditionKind::StringNotEqual
                | ConditionKind::HashFieldNotExists
                | ConditionKind::HashFieldNotEqual
        )
    }
}

/// What the store found when probing a condition's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observed<'a> {
    /// Nothing is stored at the target.
    Absent,
    /// Something is stored but it has no comparable value (e.g. a key probe).
    Present,
    /// The target holds this value.
    Value(&'a [u8]),
    /// The key holds a type the condition cannot inspect.
    WrongType,
}

/// A predicate about the remote store's state.
///
/// Conditions are immutable values. Build them with the per-kind factories,
/// which cannot produce an invalid combination, or with [`Condition::new`],
/// which validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    kind: ConditionKind,
    key: Key,
    field: Option<Vec<u8>>,
    expected: Comparand,
}

impl Condition {
    /// Creates a condition from its parts, validating the combination.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidCondition`] if a hash-scoped kind lacks
    /// a field, a key-scoped kind carries one, or an existence kind carries a
    /// comparand.
    pub fn new(
        kind: ConditionKind,
        key: impl Into<Key>,
        field: Option<Vec<u8>>,
        expected: impl Into<Comparand>,
    ) -> ProtocolResult<Self> {
        let condition = Self {
            kind,
            key: key.into(),
            field,
            expected: expected.into(),
        };
        condition.validate()?;
        Ok(condition)
    }

    /// Enforces that the key exists.
    pub fn key_exists(key: impl Into<Key>) -> Self {
        Self::unchecked(ConditionKind::KeyExists, key.into(), None, Comparand::Absent)
    }

    /// Enforces that the key does not exist.
    pub fn key_not_exists(key: impl Into<Key>) -> Self {
        Self::unchecked(ConditionKind::KeyNotExists, key.into(), None, Comparand::Absent)
    }

    /// Enforces that the string at `key` equals `expected`.
    pub fn string_equal(key: impl Into<Key>, expected: impl Into<Comparand>) -> Self {
        Self::unchecked(ConditionKind::StringEqual, key.into(), None, expected.into())
    }

    /// Enforces that the string at `key` does not equal `expected`.
    pub fn string_not_equal(key: impl Into<Key>, expected: impl Into<Comparand>) -> Self {
        Self::unchecked(
            ConditionKind::StringNotEqual,
            key.into(),
            None,
            expected.into(),
        )
    }

    /// Enforces that the hash at `key` contains `field`.
    pub fn hash_exists(key: impl Into<Key>, field: impl Into<Vec<u8>>) -> Self {
        Self::unchecked(
            ConditionKind::HashFieldExists,
            key.into(),
            Some(field.into()),
            Comparand::Absent,
        )
    }

    /// Enforces that the hash at `key` does not contain `field`.
    pub fn hash_not_exists(key: impl Into<Key>, field: impl Into<Vec<u8>>) -> Self {
        Self::unchecked(
            ConditionKind::HashFieldNotExists,
            key.into(),
            Some(field.into()),
            Comparand::Absent,
        )
    }

    /// Enforces that hash field `field` at `key` equals `expected`.
    pub fn hash_equal(
        key: impl Into<Key>,
        field: impl Into<Vec<u8>>,
        expected: impl Into<Comparand>,
    ) -> Self {
        Self::unchecked(
            ConditionKind::HashFieldEqual,
            key.into(),
            Some(field.into()),
            expected.into(),
        )
    }

    /// Enforces that hash field `field` at `key` does not equal `expected`.
    pub fn hash_not_equal(
        key: impl Into<Key>,
        field: impl Into<Vec<u8>>,
        expected: impl Into<Comparand>,
    ) -> Self {
        Self::unchecked(
            ConditionKind::HashFieldNotEqual,
            key.into(),
            Some(field.into()),
            expected.into(),
        )
    }

    fn unchecked(kind: ConditionKind, key: Key, field: Option<Vec<u8>>, expected: Comparand) -> Self {
        Self {
            kind,
            key,
            field,
            expected,
        }
    }

    /// Returns the condition kind.
    #[must_use]
    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    /// Returns the target key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Returns the hash field, for hash-scoped kinds.
    #[must_use]
    pub fn field(&self) -> Option<&[u8]> {
        self.field.as_deref()
    }

    /// Returns the comparand.
    #[must_use]
    pub fn expected(&self) -> &Comparand {
        &self.expected
    }

    /// Checks that the parts agree with the kind.
    ///
    /// Decoded conditions bypass the factories, so receivers call this
    /// before evaluating.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidCondition`] describing the mismatch.
    pub fn validate(&self) -> ProtocolResult<()> {
        match (self.kind.is_hash_scoped(), &self.field) {
            (true, None) => {
                return Err(ProtocolError::invalid_condition(format!(
                    "{:?} requires a hash field",
                    self.kind
                )))
            }
            (false, Some(_)) => {
                return Err(ProtocolError::invalid_condition(format!(
                    "{:?} does not take a hash field",
                    self.kind
                )))
            }
            _ => {}
        }

        if !self.kind.is_comparison() && !self.expected.is_absent() {
            return Err(ProtocolError::invalid_condition(format!(
                "{:?} does not take an expected value",
                self.kind
            )));
        }

        Ok(())
    }

    /// Evaluates the predicate against what the store observed at the target.
    ///
    /// A wrong-typed target never satisfies a condition, whatever its polarity.
    #[must_use]
    pub fn is_satisfied_by(&self, observed: Observed<'_>) -> bool {
        if observed == Observed::WrongType {
            return false;
        }

        let positive = match self.kind {
            ConditionKind::KeyExists
            | ConditionKind::KeyNotExists
            | ConditionKind::HashFieldExists
            | ConditionKind::HashFieldNotExists => observed != Observed::Absent,
            ConditionKind::StringEqual
            | ConditionKind::StringNotEqual
            | ConditionKind::HashFieldEqual
            | ConditionKind::HashFieldNotEqual => match (&self.expected, observed) {
                (Comparand::Absent, Observed::Absent) => true,
                (Comparand::Value(expected), Observed::Value(actual)) => {
                    expected.as_slice() == actual
                }
                _ => false,
            },
        };

        positive != self.kind.is_negated()
    }
}
