//! # State-Relay Benchmarks
//!
//! Criterion groups, registered from `benches/relay_benchmarks.rs`.

pub mod relay;
