//! # Relay Runtime
//!
//! Process-level wiring for the state relay: one host store, a configurable
//! number of subordinate replicas, and the in-memory transport between
//! them.
//!
//! ## Modules
//!
//! - `config`: `RuntimeConfig` loaded from `SR_*` environment variables
//! - `runtime`: `RelayRuntime` startup, convergence helpers and shutdown
//! - `counter`: the demo state and reducer used by the binary
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `SR_SUBORDINATES` | `2` | subordinate contexts (1..=64) |
//! | `SR_STAMP_RECIPIENT` | `true` | host stamps recipient id into `originId` |
//! | `SR_INTERNAL_PREFIX` | `@@` | prefix of commands never relayed |
//! | `SR_SNAPSHOT_MODE` | `sync` | `sync` or `async` initial state fetch |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod counter;
pub mod runtime;

pub use config::{ConfigError, RuntimeConfig, SnapshotMode, MAX_SUBORDINATES};
pub use counter::CounterState;
pub use runtime::{RelayRuntime, RuntimeError, SubordinateContext};
