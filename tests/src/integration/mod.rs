//! # Integration Flows
//!
//! Host and subordinate stores wired through the relay, the in-memory
//! transport and (where noted) the Prometheus recorder.

pub mod relay_flows;
pub mod snapshot_flows;
