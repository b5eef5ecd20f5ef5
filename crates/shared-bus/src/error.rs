//! Transport errors.

use shared_types::EndpointId;
use thiserror::Error;

/// Errors from channel transport operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The other side of the channel has gone away.
    #[error("Channel peer disconnected (endpoint {endpoint})")]
    Disconnected { endpoint: EndpointId },

    /// The host does not know this endpoint.
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(EndpointId),

    /// A request was sent on a channel nobody answers.
    #[error("No handler registered for '{channel}'")]
    NoHandler { channel: String },

    /// The handler ran but reported a failure.
    #[error("Handler for '{channel}' failed: {reason}")]
    HandlerFailed { channel: String, reason: String },

    /// The response slot was released without an answer.
    #[error("Reply for '{channel}' was dropped before it was answered")]
    ReplyDropped { channel: String },
}
