//! # State-Relay Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Hand-pumped host + subordinates topology
//! ├── benchmarks/       # Criterion groups, registered from benches/
//! │   └── relay.rs
//! └── integration/      # Cross-crate flows
//!     ├── relay_flows.rs
//!     └── snapshot_flows.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p sr-tests
//!
//! # By category
//! cargo test -p sr-tests integration::relay_flows
//! cargo test -p sr-tests integration::snapshot_flows
//!
//! # Benchmarks
//! cargo bench -p sr-tests
//! ```

#![allow(dead_code)]

pub mod benchmarks;
pub mod fixtures;
pub mod integration;
