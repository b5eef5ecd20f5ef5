//! # State-Relay Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | sr-02-classify | tag + relay decision for one command |
//! | sr-02-host-fanout | host dispatch delivered to 1, 8 and 64 subordinates |
//! | sr-02-subordinate-round-trip | subordinate dispatch applied on the host |

use criterion::{criterion_group, criterion_main, Criterion};
use sr_tests::benchmarks::relay;

fn relay_benchmarks(c: &mut Criterion) {
    relay::register_benchmarks(c);
}

criterion_group!(benches, relay_benchmarks);
criterion_main!(benches);
