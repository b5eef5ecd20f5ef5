//! # sr-01-state-container
//!
//! Reducer-driven state container used on both sides of the relay.
//!
//! ## Role in System
//!
//! - **Host context**: holds the authoritative state.
//! - **Subordinate context**: holds a replica wired to the same reducer.
//!
//! The relay treats this crate as a black box exposing `dispatch`,
//! `get_state`, `subscribe` and a middleware chain.
//!
//! ## Dispatch Pipeline
//!
//! ```text
//! dispatch(cmd) ──→ [Middleware 0] ──next──→ [Middleware 1] ──next──→ reducer
//!                                                                      │
//!                                            subscribers notified ←────┘
//! ```
//!
//! Middleware receive a [`StoreHandle`] once, when the store is built, and
//! may keep it to dispatch into the full pipeline later (e.g. replaying a
//! command that arrived over a channel).

pub mod domain;
pub mod ports;

pub use domain::errors::StoreError;
pub use domain::store::{Store, StoreBuilder, StoreHandle, SubscriptionId, INIT_KIND};
pub use ports::middleware::{Middleware, Next};
