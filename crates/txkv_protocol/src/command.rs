//! Commands carried inside an atomic unit.

use crate::value::{Key, RawValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A store command: a name plus binary-safe arguments.
///
/// The pipeline treats commands as opaque; only the store interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    name: String,
    args: Vec<Vec<u8>>,
}

impl Command {
    /// Creates a command with no arguments. The name is upper-cased.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            args: Vec::new(),
        }
    }

    /// Appends a binary argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends a key argument.
    #[must_use]
    pub fn key(self, key: &Key) -> Self {
        self.arg(key.as_bytes())
    }

    /// Appends an integer argument in decimal form.
    #[must_use]
    pub fn int_arg(self, value: i64) -> Self {
        self.arg(value.to_string())
    }

    /// Returns the command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments.
    #[must_use]
    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}

/// A command as placed in an atomic unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCommand {
    /// The command.
    pub command: Command,
    /// Whether the caller discarded the result.
    pub fire_and_forget: bool,
}

impl QueuedCommand {
    /// Creates a queued command.
    pub fn new(command: Command, fire_and_forget: bool) -> Self {
        Self {
            command,
            fire_and_forget,
        }
    }
}

/// The outcome of one executed command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandReply {
    /// The command succeeded with this value.
    Ok(RawValue),
    /// The command failed on the store.
    Err(String),
}

impl CommandReply {
    /// Creates an error reply.
    pub fn error(message: impl Into<String>) -> Self {
        CommandReply::Err(message.into())
    }

    /// Returns true if the command succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, CommandReply::Ok(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_arguments() {
        let key = Key::from("counter");
        let command = Command::new("incrby").key(&key).int_arg(-5);

        assert_eq!(command.name(), "INCRBY");
        assert_eq!(command.args(), &[b"counter".to_vec(), b"-5".to_vec()]);
        assert_eq!(command.to_string(), "INCRBY counter -5");
    }

    #[test]
    fn reply_classification() {
        assert!(CommandReply::Ok(RawValue::Integer(1)).is_ok());
        assert!(!CommandReply::error("WRONGTYPE").is_ok());
    }
}
