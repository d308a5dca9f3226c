//! Keys, comparands and raw reply values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A key in the remote store.
///
/// Keys are binary-safe; the `From` conversions cover the common text cases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key(Vec<u8>);

impl Key {
    /// Creates a key from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the key, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Key {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Key {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// The value an equality condition compares against.
///
/// `Absent` means "no value": it equals a missing key or field and never
/// equals any stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Comparand {
    /// No value.
    #[default]
    Absent,
    /// A concrete value.
    Value(Vec<u8>),
}

impl Comparand {
    /// Returns true if this is `Absent`.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Comparand::Absent)
    }

    /// Returns the bytes if present.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Comparand::Absent => None,
            Comparand::Value(bytes) => Some(bytes),
        }
    }
}

impl From<&str> for Comparand {
    fn from(value: &str) -> Self {
        Comparand::Value(value.as_bytes().to_vec())
    }
}

impl From<String> for Comparand {
    fn from(value: String) -> Self {
        Comparand::Value(value.into_bytes())
    }
}

impl From<Vec<u8>> for Comparand {
    fn from(value: Vec<u8>) -> Self {
        Comparand::Value(value)
    }
}

impl From<&[u8]> for Comparand {
    fn from(value: &[u8]) -> Self {
        Comparand::Value(value.to_vec())
    }
}

impl From<i64> for Comparand {
    fn from(value: i64) -> Self {
        Comparand::Value(value.to_string().into_bytes())
    }
}

impl<T: Into<Comparand>> From<Option<T>> for Comparand {
    fn from(value: Option<T>) -> Self {
        value.map_or(Comparand::Absent, Into::into)
    }
}

/// A raw value produced by the store for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawValue {
    /// No value (missing key or field).
    #[default]
    Nil,
    /// An integer reply.
    Integer(i64),
    /// A binary-safe bulk reply.
    Bulk(Vec<u8>),
    /// A status reply such as `OK`.
    Status(String),
}

impl RawValue {
    /// Returns true for `Nil`.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, RawValue::Nil)
    }

    /// Returns the integer, parsing bulk replies that hold a decimal number.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RawValue::Integer(n) => Some(*n),
            RawValue::Bulk(bytes) => std::str::from_utf8(bytes).ok()?.parse().ok(),
            _ => None,
        }
    }

    /// Returns the bulk bytes.
    #[must_use]
    pub fn as_bulk(&self) -> Option<&[u8]> {
        match self {
            RawValue::Bulk(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Returns a short name for the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Nil => "nil",
            RawValue::Integer(_) => "integer",
            RawValue::Bulk(_) => "bulk",
            RawValue::Status(_) => "status",
        }
    }
}
