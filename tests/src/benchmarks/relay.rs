//! # Relay Benchmarks
//!
//! Hot paths of a relayed dispatch:
//! - tagging and classification of a single command
//! - host fan-out to N subordinates, including delivery and replay
//! - subordinate → host round trip
//!
//! Conditions:
//! - random integer payloads, so no two commands are identical
//! - up to 64 subordinates (the runtime's ceiling)

use crate::fixtures::{add, Topology};
use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use serde_json::json;
use shared_types::{Command, MaybeCommand, RelaySource};
use sr_02_action_relay::{classify, to_envelope, RelayConfig};
use std::time::Duration;

pub fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("sr-02-classify");
    let mut rng = rand::thread_rng();

    group.bench_function("fresh_command", |b| {
        b.iter(|| {
            let command = Command::new("tally/add").with_payload(json!(rng.gen::<i64>()));
            black_box(classify(
                MaybeCommand::Valid(command),
                "@@",
                RelaySource::Subordinate,
            ))
        })
    });

    let forwarded = to_envelope(Command::new("tally/add"))
        .mark_forwarded(RelaySource::Host, 3)
        .into_command();
    group.bench_function("already_relayed", |b| {
        b.iter(|| {
            black_box(classify(
                MaybeCommand::Valid(forwarded.clone()),
                "@@",
                RelaySource::Subordinate,
            ))
        })
    });

    group.bench_function("parse_raw_value", |b| {
        let raw = json!({"type": "tally/add", "payload": 7, "meta": {"trace": "abc"}});
        b.iter(|| black_box(MaybeCommand::parse(raw.clone())))
    });

    group.finish();
}

pub fn bench_host_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("sr-02-host-fanout");
    group.measurement_time(Duration::from_secs(5));

    for subordinates in [1usize, 8, 64] {
        let topology = match Topology::new(subordinates, RelayConfig::default()) {
            Ok(topology) => topology,
            Err(_) => continue,
        };
        topology.settle();
        let mut rng = rand::thread_rng();

        group.throughput(Throughput::Elements(subordinates as u64));
        group.bench_with_input(
            BenchmarkId::new("dispatch_and_deliver", subordinates),
            &topology,
            |b, topology| {
                b.iter(|| {
                    topology.host.dispatch(add(rng.gen_range(-100..100)));
                    black_box(topology.pump_subordinates())
                })
            },
        );
    }

    group.finish();
}

pub fn bench_subordinate_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("sr-02-subordinate-round-trip");

    if let Ok(topology) = Topology::new(1, RelayConfig::default()) {
        topology.settle();
        group.bench_function("dispatch_and_apply_on_host", |b| {
            b.iter(|| {
                topology.replicas[0].store.dispatch(add(1));
                black_box(topology.hub.pump())
            })
        });
    }

    group.finish();
}

pub fn register_benchmarks(c: &mut Criterion) {
    bench_classify(c);
    bench_host_fanout(c);
    bench_subordinate_round_trip(c);
}
