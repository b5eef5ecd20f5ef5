//! # Shared Types Crate
//!
//! This crate contains the data that crosses the isolation boundary between
//! the host context and its subordinate contexts.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Commands, relay metadata and envelopes are
//!   defined here and nowhere else.
//! - **Parse, don't re-check**: raw values become a [`MaybeCommand`] once, at
//!   the boundary. Downstream code matches on the variant.
//! - **Copy-on-tag**: an [`Envelope`] is a new value; tagging never mutates
//!   a command somebody else still holds.

pub mod channels;
pub mod command;
pub mod envelope;
pub mod ids;

pub use channels::*;
pub use command::{Command, MaybeCommand};
pub use envelope::{Envelope, RelayMeta, RelaySource, RELAY_META_KEY};
pub use ids::EndpointId;
