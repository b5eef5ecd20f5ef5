//! # Bridge Surface
//!
//! When a subordinate context is isolated it never sees its transport.
//! Setup code running with transport access calls [`install_bridge`],
//! which wraps the transport in a [`BridgeSurface`] and exposes it in the
//! context's [`IsolatedGlobals`] under [`BRIDGE_GLOBAL_KEY`]. Application
//! code only ever gets the [`CommandBridge`] operations.
//!
//! ```text
//! setup (privileged)                 isolated context
//! ──────────────────                 ────────────────
//! InMemoryPort ──→ BridgeSurface ──→ globals[BRIDGE_GLOBAL_KEY]
//!                                          │
//!                                          ▼
//!                               SubordinateRelay::from_globals
//! ```

use crate::ports::outbound::{CommandBridge, CommandListener};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use shared_bus::{
    register_unique, unregister, InboundMessage, Listener, ListenerId, SubordinateTransport,
    TransportError,
};
use shared_types::{
    EndpointId, Envelope, MaybeCommand, BRIDGE_GLOBAL_KEY, CHANNEL_SNAPSHOT_ASYNC,
    CHANNEL_SNAPSHOT_SYNC, CHANNEL_TO_HOST, CHANNEL_TO_SUBORDINATE,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Name of the setup step that installs the bridge.
pub const INSTALL_STEP: &str = "install_bridge";

/// [`CommandBridge`] over a subordinate transport.
pub struct BridgeSurface {
    transport: Arc<dyn SubordinateTransport>,
}

impl BridgeSurface {
    pub fn new(transport: Arc<dyn SubordinateTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl CommandBridge for BridgeSurface {
    fn endpoint_id(&self) -> EndpointId {
        self.transport.endpoint_id()
    }

    fn send_command(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.transport.send(CHANNEL_TO_HOST, envelope.into_value())
    }

    fn add_command_listener(&self, listener: CommandListener) -> ListenerId {
        let channel_listener: Listener = Arc::new(move |message: &InboundMessage| {
            listener(MaybeCommand::parse(message.payload.clone()))
        });
        register_unique(&*self.transport, CHANNEL_TO_SUBORDINATE, channel_listener)
    }

    fn remove_command_listener(&self, id: ListenerId) -> bool {
        unregister(&*self.transport, CHANNEL_TO_SUBORDINATE, id)
    }

    fn request_snapshot_sync(&self) -> Result<Value, TransportError> {
        self.transport.send_sync(CHANNEL_SNAPSHOT_SYNC, Value::Null)
    }

    async fn request_snapshot(&self) -> Result<Value, TransportError> {
        self.transport.invoke(CHANNEL_SNAPSHOT_ASYNC, Value::Null).await
    }
}

impl fmt::Debug for BridgeSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeSurface")
            .field("endpoint", &self.transport.endpoint_id())
            .finish()
    }
}

/// Named values visible inside an isolated context.
#[derive(Default)]
pub struct IsolatedGlobals {
    entries: RwLock<HashMap<String, Arc<dyn CommandBridge>>>,
}

impl IsolatedGlobals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose `bridge` under `key`, replacing any previous value.
    pub fn expose(&self, key: &str, bridge: Arc<dyn CommandBridge>) {
        self.entries.write().insert(key.to_string(), bridge);
    }

    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<Arc<dyn CommandBridge>> {
        self.entries.read().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

/// Wrap `transport` in a [`BridgeSurface`] and expose it in `globals`.
pub fn install_bridge(
    globals: &IsolatedGlobals,
    transport: Arc<dyn SubordinateTransport>,
) -> Arc<BridgeSurface> {
    let bridge = Arc::new(BridgeSurface::new(transport));
    globals.expose(BRIDGE_GLOBAL_KEY, bridge.clone());
    info!(endpoint = %bridge.endpoint_id(), key = BRIDGE_GLOBAL_KEY, "Relay bridge installed");
    bridge
}
