//! Relay configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use sr_02_action_relay::RelayConfigBuilder;
//!
//! let config = RelayConfigBuilder::new()
//!     .internal_prefix("@@")
//!     .stamp_recipient(true)
//!     .before_send(|command| command.with_meta("sentAt", json!(now())))
//!     .build()?;
//! ```

use crate::domain::hooks::SendHooks;
use crate::error::RelayError;
use shared_types::{Command, INTERNAL_KIND_PREFIX};
use std::sync::Arc;

/// Configuration shared by both interceptors.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Discriminator prefix of state container housekeeping commands.
    /// Such commands are never relayed.
    pub internal_prefix: String,
    /// Host only: write each recipient's endpoint id into `originId`.
    pub stamp_recipient: bool,
    pub hooks: SendHooks,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            internal_prefix: INTERNAL_KIND_PREFIX.to_string(),
            stamp_recipient: true,
            hooks: SendHooks::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<(), RelayError> {
        // An empty prefix matches every discriminator and would silence the relay.
        if self.internal_prefix.is_empty() {
            return Err(RelayError::InvalidConfig(
                "internal_prefix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for [`RelayConfig`].
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn internal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.internal_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn stamp_recipient(mut self, stamp: bool) -> Self {
        self.config.stamp_recipient = stamp;
        self
    }

    #[must_use]
    pub fn before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(Command) -> Command + Send + Sync + 'static,
    {
        self.config.hooks.before_send = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn after_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(Command) -> Command + Send + Sync + 'static,
    {
        self.config.hooks.after_send = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<RelayConfig, RelayError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
