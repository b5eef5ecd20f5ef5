//! # Transport Ports
//!
//! The channel API each side of the relay consumes. The host end can see
//! every connected subordinate and answer requests; a subordinate end can
//! only talk to the host.

use crate::error::TransportError;
use crate::listener::{InboundMessage, Listener, ListenerId};
use crate::registry::ChannelRegistrations;
use async_trait::async_trait;
use serde_json::Value;
use shared_types::EndpointId;
use std::sync::Arc;

/// Handle for a specific installed request handler.
///
/// Handlers are keyed by channel, so a later install replaces an earlier
/// one. The id lets the earlier owner tell whether the slot is still its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(pub u64);

/// Answers an invoke-style request.
pub type RequestHandler =
    Arc<dyn Fn(&InboundMessage) -> Result<Value, TransportError> + Send + Sync>;

/// Answers a blocking request by writing into its response slot.
pub type SyncRequestHandler = Arc<dyn Fn(&mut SyncRequest) + Send + Sync>;

/// A blocking request being answered on the host.
///
/// The caller is parked until the handler returns; whatever the handler left
/// in the response slot is what the caller receives (`Null` if nothing).
#[derive(Debug)]
pub struct SyncRequest {
    pub message: InboundMessage,
    return_value: Value,
}

impl SyncRequest {
    #[must_use]
    pub fn new(message: InboundMessage) -> Self {
        Self {
            message,
            return_value: Value::Null,
        }
    }

    /// Write the response slot.
    pub fn set_return_value(&mut self, value: Value) {
        self.return_value = value;
    }

    #[must_use]
    pub fn return_value(&self) -> &Value {
        &self.return_value
    }

    #[must_use]
    pub fn into_return_value(self) -> Value {
        self.return_value
    }
}

/// Listener management common to both ends.
pub trait ListenerRegistry: Send + Sync {
    /// Add a listener for `channel`.
    fn add_listener(&self, channel: &str, listener: Listener) -> ListenerId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn remove_listener(&self, channel: &str, id: ListenerId) -> bool;

    /// The context's Channel Registration map.
    fn registrations(&self) -> &ChannelRegistrations;
}

/// Subordinate end of the channel.
#[async_trait]
pub trait SubordinateTransport: ListenerRegistry {
    /// Identifier the host knows this context by.
    fn endpoint_id(&self) -> EndpointId;

    /// Fire-and-forget send to the host.
    fn send(&self, channel: &str, payload: Value) -> Result<(), TransportError>;

    /// Blocking request to the host.
    ///
    /// Parks the calling thread until the host answers. There is no timeout:
    /// a host that never processes its queue blocks the caller forever. Never
    /// call this from a thread the host itself is pumped on.
    fn send_sync(&self, channel: &str, payload: Value) -> Result<Value, TransportError>;

    /// Invoke-style request; suspends only the calling task.
    async fn invoke(&self, channel: &str, payload: Value) -> Result<Value, TransportError>;
}

/// Host end of the channel.
pub trait HostTransport: ListenerRegistry {
    /// Currently connected subordinate endpoints, in connection order.
    fn endpoints(&self) -> Vec<EndpointId>;

    /// Fire-and-forget send to a single subordinate.
    fn send_to(
        &self,
        endpoint: EndpointId,
        channel: &str,
        payload: Value,
    ) -> Result<(), TransportError>;

    /// Install the invoke handler for `channel`, replacing any existing one.
    fn handle(&self, channel: &str, handler: RequestHandler) -> HandlerId;

    /// Install the blocking-request handler for `channel`, replacing any
    /// existing one.
    fn handle_sync(&self, channel: &str, handler: SyncRequestHandler) -> HandlerId;

    /// Remove whatever handler is installed for `channel`.
    fn remove_handler(&self, channel: &str) -> bool;

    /// Remove the handler for `channel` only if it is still `id`.
    ///
    /// Returns `false` if the slot is empty or was taken over by a later
    /// install.
    fn release_handler(&self, channel: &str, id: HandlerId) -> bool;
}
