//! Error types for the action relay

use shared_bus::TransportError;
use sr_01_state_container::StoreError;
use thiserror::Error;

/// Errors surfaced by the relay.
///
/// Only [`RelayError::BridgeNotInstalled`] and [`RelayError::InvalidConfig`]
/// escape relay construction. Channel failures during dispatch are logged
/// and never reach application code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error(
        "Relay bridge not installed: `{key}` is missing from the isolated context. \
         Call `{step}` while setting up the subordinate context, before constructing the relay"
    )]
    BridgeNotInstalled { key: String, step: String },

    #[error("Invalid relay configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("State container error: {0}")]
    Store(#[from] StoreError),
}
