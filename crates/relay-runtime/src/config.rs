//! # Runtime Configuration
//!
//! Read from the environment, validated before anything is wired.

use shared_types::INTERNAL_KIND_PREFIX;
use sr_02_action_relay::{RelayConfig, RelayConfigBuilder, RelayError};
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on subordinate contexts per runtime.
pub const MAX_SUBORDINATES: usize = 64;

/// How a new subordinate obtains the host's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotMode {
    /// Block before the subordinate store is built.
    #[default]
    Sync,
    /// Build the store, then hydrate it once the host answers.
    Async,
}

impl FromStr for SnapshotMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sync" => Ok(SnapshotMode::Sync),
            "async" => Ok(SnapshotMode::Async),
            _ => Err(ConfigError::InvalidValue {
                var: "SR_SNAPSHOT_MODE",
                value: value.to_string(),
            }),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of subordinate contexts to start.
    pub subordinates: usize,
    /// Host stamps each recipient's id into `originId`.
    pub stamp_recipient: bool,
    /// Prefix of housekeeping commands that are never relayed.
    pub internal_prefix: String,
    pub snapshot_mode: SnapshotMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            subordinates: 2,
            stamp_recipient: true,
            internal_prefix: INTERNAL_KIND_PREFIX.to_string(),
            snapshot_mode: SnapshotMode::Sync,
        }
    }
}

impl RuntimeConfig {
    /// Load from `SR_SUBORDINATES`, `SR_STAMP_RECIPIENT`,
    /// `SR_INTERNAL_PREFIX` and `SR_SNAPSHOT_MODE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("SR_SUBORDINATES") {
            config.subordinates = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "SR_SUBORDINATES",
                value,
            })?;
        }
        if let Some(value) = lookup("SR_STAMP_RECIPIENT") {
            config.stamp_recipient = match value.to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "SR_STAMP_RECIPIENT",
                        value,
                    })
                }
            };
        }
        if let Some(value) = lookup("SR_INTERNAL_PREFIX") {
            config.internal_prefix = value;
        }
        if let Some(value) = lookup("SR_SNAPSHOT_MODE") {
            config.snapshot_mode = value.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subordinates == 0 || self.subordinates > MAX_SUBORDINATES {
            return Err(ConfigError::SubordinateCount {
                count: self.subordinates,
            });
        }
        if self.internal_prefix.is_empty() {
            return Err(ConfigError::EmptyInternalPrefix);
        }
        Ok(())
    }

    /// Relay configuration shared by every context.
    pub fn relay_config(&self) -> Result<RelayConfig, RelayError> {
        RelayConfigBuilder::new()
            .internal_prefix(self.internal_prefix.clone())
            .stamp_recipient(self.stamp_recipient)
            .build()
    }
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Subordinate count must be between 1 and {max}, got {count}", max = MAX_SUBORDINATES)]
    SubordinateCount { count: usize },

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("SR_INTERNAL_PREFIX must not be empty")]
    EmptyInternalPrefix,
}
