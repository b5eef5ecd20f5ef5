//! # Commands
//!
//! A command is a named request to mutate state: a `type` discriminator, an
//! arbitrary payload, an optional metadata map and any other top-level keys
//! the dispatcher put on it (`error`, custom fields). Those are carried
//! along untouched.
//!
//! Anything can be dispatched into a state container, so the relay never
//! assumes a value is command-shaped. [`MaybeCommand::parse`] is the single
//! validating step; values without a usable discriminator end up in
//! [`MaybeCommand::Invalid`] and are carried along untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A command-shaped value.
///
/// Wire form: `{"type": "...", "payload": ..., "meta": {...}, ...}`. The
/// legacy `kind` key is accepted as an alias for `type` on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Discriminator. Never empty.
    #[serde(rename = "type", alias = "kind")]
    pub kind: String,

    /// Arbitrary payload, `Null` when absent.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,

    /// Optional metadata map. Relay metadata lives under a reserved key here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,

    /// Every other top-level key, e.g. `error: true`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Command {
    /// Create a command with no payload and no metadata.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Value::Null,
            meta: None,
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set a single metadata entry, creating the map if needed.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Set a top-level key outside the command model.
    ///
    /// `type`, `kind`, `payload` and `meta` are reserved; use the dedicated
    /// builders for those.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if !is_reserved(&key) {
            self.extra.insert(key, value);
        }
        self
    }

    #[must_use]
    pub fn extra_value(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Look up a metadata entry.
    #[must_use]
    pub fn meta_value(&self, key: &str) -> Option<&Value> {
        self.meta.as_ref().and_then(|meta| meta.get(key))
    }

    /// True if the discriminator starts with `prefix`.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.kind.starts_with(prefix)
    }

    /// Convert into the wire representation.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut fields = self.extra;
        fields.insert("type".to_string(), Value::String(self.kind));
        if !self.payload.is_null() {
            fields.insert("payload".to_string(), self.payload);
        }
        if let Some(meta) = self.meta {
            fields.insert("meta".to_string(), Value::Object(meta));
        }
        Value::Object(fields)
    }
}

/// Result of the validating parse step at the dispatch boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum MaybeCommand {
    /// The value carried a non-empty string discriminator.
    Valid(Command),
    /// Anything else. Passed through every relay stage unchanged.
    Invalid(Value),
}

impl MaybeCommand {
    /// Parse an arbitrary value.
    ///
    /// The discriminator is read from `type`, falling back to `kind`. Both
    /// discriminator keys are consumed. Keys other than `payload` and `meta`
    /// are kept in [`Command::extra`]. A `meta` that is not an object is
    /// dropped.
    #[must_use]
    pub fn parse(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::Invalid(value);
        };

        let kind = match discriminator(&fields) {
            Some(kind) => kind.to_string(),
            None => return Self::Invalid(Value::Object(fields)),
        };

        let payload = fields.remove("payload").unwrap_or(Value::Null);
        let meta = match fields.remove("meta") {
            Some(Value::Object(meta)) => Some(meta),
            _ => None,
        };
        fields.remove("type");
        fields.remove("kind");

        Self::Valid(Command {
            kind,
            payload,
            meta,
            extra: fields,
        })
    }

    #[must_use]
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    #[must_use]
    pub fn as_command(&self) -> Option<&Command> {
        match self {
            Self::Valid(command) => Some(command),
            Self::Invalid(_) => None,
        }
    }

    #[must_use]
    pub fn into_command(self) -> Option<Command> {
        match self {
            Self::Valid(command) => Some(command),
            Self::Invalid(_) => None,
        }
    }

    /// Discriminator, if command-shaped.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.as_command().map(|command| command.kind.as_str())
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Valid(command) => command.into_value(),
            Self::Invalid(value) => value,
        }
    }
}

fn is_reserved(key: &str) -> bool {
    matches!(key, "type" | "kind" | "payload" | "meta")
}

fn discriminator(fields: &Map<String, Value>) -> Option<&str> {
    ["type", "kind"]
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find(|kind| !kind.is_empty())
}

impl From<Value> for MaybeCommand {
    fn from(value: Value) -> Self {
        Self::parse(value)
    }
}

impl From<Command> for MaybeCommand {
    fn from(command: Command) -> Self {
        Self::Valid(command)
    }
}
