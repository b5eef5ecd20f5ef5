//! # SR-02 Action Relay
//!
//! Keeps a host state container and any number of subordinate replicas
//! converged by relaying dispatched commands across a channel boundary.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): pure decisions
//!   - `to_envelope` / `is_already_relayed` / `classify`: the envelope tagger
//!   - `RelayConfig`, `RelayConfigBuilder`, `SendHooks`
//!
//! - **Ports Layer** (`ports/`)
//!   - `CommandBridge`: what a subordinate may do across the boundary
//!
//! - **Service Layer** (`service/`)
//!   - `SubordinateRelay`, `HostRelay`: store middleware
//!   - `ReplayListener`: inbound command → local dispatch
//!   - `Disposer`: revocable registrations
//!
//! - **Adapters Layer** (`adapters/`)
//!   - `BridgeSurface`, `IsolatedGlobals`, `install_bridge`
//!   - `fetch_initial_state`, `hydrate_from_host`
//!
//! ## Flow
//!
//! ```text
//!  subordinate                                   host
//!  ───────────                                   ────
//!  dispatch(increment)
//!   └─ SubordinateRelay: fresh → forwarded ──────→ ReplayListener
//!   └─ reducer                                     └─ dispatch
//!                                                     └─ HostRelay: forwarded → pass
//!                                                     └─ reducer
//!
//!  ReplayListener ←──────── forwarded, stamped ── HostRelay: fresh
//!   └─ dispatch                                    dispatch(reset)
//!      └─ SubordinateRelay: forwarded → pass
//!      └─ reducer
//! ```
//!
//! ## Invariants
//!
//! - An envelope with `forwarded == true` is never sent again, by either
//!   side. This check happens before any send.
//! - Values without a discriminator and housekeeping commands (internal
//!   prefix) are never sent.
//! - Each channel has at most one replay listener per context; each
//!   snapshot channel at most one handler.
//! - `dispose()` removes every registration; calling it again is a no-op.
//!
//! ## Usage Example
//!
//! ```ignore
//! use sr_02_action_relay::{install_bridge, HostRelay, IsolatedGlobals, RelayConfig, SubordinateRelay};
//!
//! let hub = InMemoryHub::new();
//! let host_relay = Arc::new(HostRelay::new(Arc::new(hub.clone()), RelayConfig::default())?);
//! let host = Store::builder(Counter::default(), reduce).middleware(host_relay.clone()).build();
//!
//! let globals = IsolatedGlobals::new();
//! install_bridge(&globals, Arc::new(hub.connect()));
//! let relay = Arc::new(SubordinateRelay::from_globals(&globals, RelayConfig::default())?);
//! let replica = Store::builder(Counter::default(), reduce).middleware(relay.clone()).build();
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;

pub use adapters::{
    fetch_initial_state, hydrate_from_host, install_bridge, BridgeSurface, IsolatedGlobals,
    INSTALL_STEP,
};
pub use domain::{
    classify, is_already_relayed, to_envelope, CommandHook, Disposition, PassReason, RelayConfig,
    RelayConfigBuilder, SendHooks,
};
pub use error::RelayError;
pub use metrics::{MetricsRecorder, MetricsSnapshot, NoOpMetrics, RelayMetrics};
pub use ports::{CommandBridge, CommandListener};
pub use service::{Disposer, HostRelay, ReplayListener, SubordinateRelay};
