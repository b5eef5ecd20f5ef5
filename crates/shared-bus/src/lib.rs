//! # Shared Bus - Channel Transport Between Contexts
//!
//! The host context and its subordinate contexts share no memory. Everything
//! they exchange goes through the ports defined here.
//!
//! ## Topology
//!
//! ```text
//!  ┌──────────────┐   send / send_sync / invoke   ┌──────────────┐
//!  │ Subordinate 1│ ─────────────────────────────→│              │
//!  └──────────────┘ ←─────────────────────────────│     Host     │
//!  ┌──────────────┐          send_to(id)          │  (endpoints, │
//!  │ Subordinate 2│ ←────────────────────────────→│   handlers)  │
//!  └──────────────┘                               └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **FIFO per sender**: messages from one context arrive in send order.
//! - **Fire-and-forget** command sends; request/response only for
//!   `send_sync` and `invoke`.
//! - **No timeout on `send_sync`**: a host that never answers blocks the
//!   caller indefinitely.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod listener;
pub mod memory;
pub mod ports;
pub mod registry;

// Re-export main types
pub use error::TransportError;
pub use listener::{InboundMessage, Listener, ListenerId, ListenerTable};
pub use memory::{InMemoryHub, InMemoryPort};
pub use ports::{
    HandlerId, HostTransport, ListenerRegistry, RequestHandler, SubordinateTransport, SyncRequest,
    SyncRequestHandler,
};
pub use registry::{register_unique, unregister, ChannelRegistrations};
