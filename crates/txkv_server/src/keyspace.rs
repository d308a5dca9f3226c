//! In-memory keyspace holding strings and hashes.

use crate::error::CommandError;
use std::collections::HashMap;
use txkv_protocol::{Command, CommandReply, Condition, ConditionKind, Key, Observed, RawValue};

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// A binary-safe string.
    String(Vec<u8>),
    /// A hash of field to value.
    Hash(HashMap<Vec<u8>, Vec<u8>>),
}

/// One numbered database.
#[derive(Debug, Default)]
pub struct Keyspace {
    entries: HashMap<Key, Entry>,
}

impl Keyspace {
    /// Creates an empty keyspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Probes the target of a condition.
    pub fn observe(&self, condition: &Condition) -> Observed<'_> {
        let entry = self.entries.get(condition.key());
        match condition.kind() {
            ConditionKind::KeyExists | ConditionKind::KeyNotExists => match entry {
                Some(_) => Observed::Present,
                None => Observed::Absent,
            },
            ConditionKind::StringEqual | ConditionKind::StringNotEqual => match entry {
                None => Observed::Absent,
                Some(Entry::String(value)) => Observed::Value(value.as_slice()),
                Some(Entry::Hash(_)) => Observed::WrongType,
            },
            ConditionKind::HashFieldExists
            | ConditionKind::HashFieldNotExists
            | ConditionKind::HashFieldEqual
            | ConditionKind::HashFieldNotEqual => match entry {
                None => Observed::Absent,
                Some(Entry::Hash(fields)) => fields
                    .get(condition.field().unwrap_or_default())
                    .map_or(Observed::Absent, |value| Observed::Value(value.as_slice())),
                Some(Entry::String(_)) => Observed::WrongType,
            },
        }
    }

    /// Executes a command, turning failures into an error reply.
    pub fn execute(&mut self, command: &Command) -> CommandReply {
        match self.apply(command) {
            Ok(value) => CommandReply::Ok(value),
            Err(e) => CommandReply::Err(e.to_string()),
        }
    }

    fn apply(&mut self, command: &Command) -> Result<RawValue, CommandError> {
        match command.name() {
            "GET" => {
                let [key] = arity::<1>(command)?;
                Ok(bulk_or_nil(self.get(&Key::from(key.as_slice()))?))
            }
            "SET" => {
                let [key, value] = arity::<2>(command)?;
                self.set(Key::from(key.as_slice()), value.clone());
                Ok(RawValue::Status("OK".into()))
            }
            "INCRBY" => {
                let [key, delta] = arity::<2>(command)?;
                let delta = parse_integer(delta)?;
                self.incr_by(Key::from(key.as_slice()), delta)
                    .map(RawValue::Integer)
            }
            "DECRBY" => {
                let [key, delta] = arity::<2>(command)?;
                let delta = parse_integer(delta)?
                    .checked_neg()
                    .ok_or(CommandError::Overflow)?;
                self.incr_by(Key::from(key.as_slice()), delta)
                    .map(RawValue::Integer)
            }
            "EXISTS" => {
                let [key] = arity::<1>(command)?;
                Ok(flag(self.exists(&Key::from(key.as_slice()))))
            }
            "DEL" => {
                let [key] = arity::<1>(command)?;
                Ok(flag(self.delete(&Key::from(key.as_slice()))))
            }
            "HGET" => {
                let [key, field] = arity::<2>(command)?;
                Ok(bulk_or_nil(self.hget(&Key::from(key.as_slice()), field)?))
            }
            "HSET" => {
                let [key, field, value] = arity::<3>(command)?;
                self.hset(Key::from(key.as_slice()), field.clone(), value.clone())
                    .map(flag)
            }
            "HEXISTS" => {
                let [key, field] = arity::<2>(command)?;
                self.hexists(&Key::from(key.as_slice()), field).map(flag)
            }
            "HDEL" => {
                let [key, field] = arity::<2>(command)?;
                self.hdel(&Key::from(key.as_slice()), field).map(flag)
            }
            other => Err(CommandError::UnknownCommand(other.to_ascii_lowercase())),
        }
    }

    /// Returns the string at `key`.
    pub fn get(&self, key: &Key) -> Result<Option<&[u8]>, CommandError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::String(value)) => Ok(Some(value)),
            Some(Entry::Hash(_)) => Err(CommandError::WrongType),
        }
    }

    /// Stores a string, replacing whatever the key held.
    pub fn set(&mut self, key: Key, value: Vec<u8>) {
        self.entries.insert(key, Entry::String(value));
    }

    /// Adds `delta` to the integer stored at `key` (absent counts as zero).
    pub fn incr_by(&mut self, key: Key, delta: i64) -> Result<i64, CommandError> {
        let current = match self.get(&key)? {
            Some(value) => parse_integer(value)?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or(CommandError::Overflow)?;
        self.set(key, next.to_string().into_bytes());
        Ok(next)
    }

    /// Returns true if `key` holds any value.
    pub fn exists(&self, key: &Key) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes `key`, returning true if it existed.
    pub fn delete(&mut self, key: &Key) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Returns a hash field.
    pub fn hget(&self, key: &Key, field: &[u8]) -> Result<Option<&[u8]>, CommandError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Entry::Hash(fields)) => Ok(fields.get(field).map(Vec::as_slice)),
            Some(Entry::String(_)) => Err(CommandError::WrongType),
        }
    }

    /// Sets a hash field, returning true if the field is new.
    pub fn hset(&mut self, key: Key, field: Vec<u8>, value: Vec<u8>) -> Result<bool, CommandError> {
        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| Entry::Hash(HashMap::new()));
        match entry {
            Entry::Hash(fields) => Ok(fields.insert(field, value).is_none()),
            Entry::String(_) => Err(CommandError::WrongType),
        }
    }

    /// Returns true if the hash at `key` has `field`.
    pub fn hexists(&self, key: &Key, field: &[u8]) -> Result<bool, CommandError> {
        self.hget(key, field).map(|value| value.is_some())
    }

    /// Removes a hash field; an emptied hash removes the key.
    pub fn hdel(&mut self, key: &Key, field: &[u8]) -> Result<bool, CommandError> {
        let (removed, now_empty) = match self.entries.get_mut(key) {
            None => return Ok(false),
            Some(Entry::String(_)) => return Err(CommandError::WrongType),
            Some(Entry::Hash(fields)) => (fields.remove(field).is_some(), fields.is_empty()),
        };
        if now_empty {
            self.entries.remove(key);
        }
        Ok(removed)
    }
}

fn arity<const N: usize>(command: &Command) -> Result<&[Vec<u8>; N], CommandError> {
    <&[Vec<u8>; N]>::try_from(command.args())
        .map_err(|_| CommandError::WrongArity(command.name().to_ascii_lowercase()))
}

fn parse_integer(bytes: &[u8]) -> Result<i64, CommandError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(CommandError::NotInteger)
}

fn bulk_or_nil(value: Option<&[u8]>) -> RawValue {
    value.map_or(RawValue::Nil, |bytes| RawValue::Bulk(bytes.to_vec()))
}

fn flag(value: bool) -> RawValue {
    RawValue::Integer(i64::from(value))
}
