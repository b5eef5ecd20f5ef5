//! # Command Bridge (Driven Port)
//!
//! The least-privilege surface a subordinate context is given. It carries
//! commands and snapshots, and nothing else: no channel names, no raw
//! transport, no way to listen on arbitrary channels.

use async_trait::async_trait;
use serde_json::Value;
use shared_bus::{ListenerId, TransportError};
use shared_types::{EndpointId, Envelope, MaybeCommand};
use std::sync::Arc;

/// Receives commands relayed by the host.
pub type CommandListener = Arc<dyn Fn(MaybeCommand) + Send + Sync>;

/// Operations available to a subordinate context.
#[async_trait]
pub trait CommandBridge: Send + Sync {
    /// Identity of the subordinate context this bridge was installed for.
    fn endpoint_id(&self) -> EndpointId;

    /// Send a relay envelope to the host. Fire-and-forget.
    fn send_command(&self, envelope: Envelope) -> Result<(), TransportError>;

    /// Listen for commands from the host.
    ///
    /// Replaces the listener added by a previous call, so at most one is
    /// active per bridge.
    fn add_command_listener(&self, listener: CommandListener) -> ListenerId;

    /// Returns `false` if `id` was not registered.
    fn remove_command_listener(&self, id: ListenerId) -> bool;

    /// Fetch the host's state, blocking the calling thread until it replies.
    ///
    /// There is no timeout: if the host never answers, this never returns.
    /// Only use it during startup, never from a context's delivery loop.
    fn request_snapshot_sync(&self) -> Result<Value, TransportError>;

    /// Fetch the host's state without blocking the thread.
    async fn request_snapshot(&self) -> Result<Value, TransportError>;
}
