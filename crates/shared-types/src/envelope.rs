//! # Relay Envelope
//!
//! A command plus its relay metadata. The metadata is stored inside the
//! command's `meta` map under [`RELAY_META_KEY`], so the wire form of an
//! envelope is just a command.
//!
//! ## Loop Prevention
//!
//! Once `forwarded` is true no interceptor may relay the envelope again.
//! This is the only mechanism that stops a command bouncing between host and
//! subordinate, and it is checked before any send happens.

use crate::command::Command;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved metadata key carrying [`RelayMeta`].
pub const RELAY_META_KEY: &str = "__relay";

/// Which side originated a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelaySource {
    Host,
    Subordinate,
    #[default]
    Unknown,
}

impl RelaySource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RelaySource::Host => "host",
            RelaySource::Subordinate => "subordinate",
            RelaySource::Unknown => "unknown",
        }
    }
}

/// Relay bookkeeping attached to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMeta {
    /// True once the command has crossed the boundary.
    pub forwarded: bool,
    /// Side that originated the command.
    pub source: RelaySource,
    /// Subordinate endpoint that produced or last touched it, `0` for host.
    pub origin_id: u32,
}

impl RelayMeta {
    /// Metadata for a command no interceptor has touched yet.
    pub const UNTAGGED: RelayMeta = RelayMeta {
        forwarded: false,
        source: RelaySource::Unknown,
        origin_id: 0,
    };

    /// Read relay metadata from a command, if present and well-formed.
    #[must_use]
    pub fn read(command: &Command) -> Option<Self> {
        command
            .meta_value(RELAY_META_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    fn to_value(self) -> Value {
        serde_json::json!({
            "forwarded": self.forwarded,
            "source": self.source.as_str(),
            "originId": self.origin_id,
        })
    }
}

impl Default for RelayMeta {
    fn default() -> Self {
        Self::UNTAGGED
    }
}

/// A command carrying relay metadata.
///
/// Every transformation consumes the envelope and returns a new one; there
/// is no way to change the metadata of an envelope somebody else holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    command: Command,
    relay: RelayMeta,
}

impl Envelope {
    /// Attach `relay` to `command`, replacing any relay metadata it had.
    #[must_use]
    pub fn from_parts(mut command: Command, relay: RelayMeta) -> Self {
        command = command.with_meta(RELAY_META_KEY, relay.to_value());
        Self { command, relay }
    }

    /// Wrap a command whose metadata already carries `relay`.
    ///
    /// Hands the command back if it has no (or malformed) relay metadata.
    pub fn from_tagged(command: Command) -> Result<Self, Command> {
        match RelayMeta::read(&command) {
            Some(relay) => Ok(Self { command, relay }),
            None => Err(command),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.command.kind
    }

    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.command.payload
    }

    #[must_use]
    pub fn relay(&self) -> RelayMeta {
        self.relay
    }

    #[must_use]
    pub fn command(&self) -> &Command {
        &self.command
    }

    #[must_use]
    pub fn into_command(self) -> Command {
        self.command
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.command.into_value()
    }

    /// Replace the relay metadata.
    #[must_use]
    pub fn with_relay(self, relay: RelayMeta) -> Self {
        Self::from_parts(self.command, relay)
    }

    /// Mark as forwarded by `source`, stamping `origin_id`.
    #[must_use]
    pub fn mark_forwarded(self, source: RelaySource, origin_id: u32) -> Self {
        self.with_relay(RelayMeta {
            forwarded: true,
            source,
            origin_id,
        })
    }

    /// Copy with a different `origin_id`, for per-recipient delivery.
    #[must_use]
    pub fn stamped(&self, origin_id: u32) -> Self {
        self.clone().with_relay(RelayMeta {
            origin_id,
            ..self.relay
        })
    }

    /// Transform the command part, keeping the relay metadata.
    ///
    /// Used by send hooks; any relay metadata the closure writes into the
    /// command is overwritten.
    #[must_use]
    pub fn map_command(self, f: impl FnOnce(Command) -> Command) -> Self {
        let relay = self.relay;
        Self::from_parts(f(self.command), relay)
    }
}
