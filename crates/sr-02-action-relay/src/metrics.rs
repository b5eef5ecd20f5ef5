//! Metrics hooks for relay operations
//!
//! ## Usage
//!
//! ```ignore
//! use sr_02_action_relay::metrics::RelayMetrics;
//!
//! let metrics = Arc::new(RelayMetrics::new());
//! let relay = HostRelay::new(hub, config)?.with_metrics(metrics.clone());
//! // ... dispatch ...
//! println!("{:?}", metrics.snapshot());
//! ```

use crate::domain::tagger::PassReason;
use shared_types::RelaySource;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for relay activity.
#[derive(Default, Debug)]
pub struct RelayMetrics {
    /// Commands tagged and sent across the boundary
    pub relayed: AtomicU64,
    /// Individual channel sends that succeeded
    pub sends: AtomicU64,
    /// Individual channel sends that failed
    pub send_failures: AtomicU64,
    /// Commands skipped because they were already relayed
    pub already_relayed: AtomicU64,
    /// Non-commands and internal commands passed through
    pub pass_through: AtomicU64,
    /// Inbound commands dispatched into the local store
    pub replays: AtomicU64,
    /// Snapshot requests answered by the host
    pub snapshots_served: AtomicU64,
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            relayed: self.relayed.load(Ordering::Relaxed),
            sends: self.sends.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            already_relayed: self.already_relayed.load(Ordering::Relaxed),
            pass_through: self.pass_through.load(Ordering::Relaxed),
            replays: self.replays.load(Ordering::Relaxed),
            snapshots_served: self.snapshots_served.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.relayed,
            &self.sends,
            &self.send_failures,
            &self.already_relayed,
            &self.pass_through,
            &self.replays,
            &self.snapshots_served,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub relayed: u64,
    pub sends: u64,
    pub send_failures: u64,
    pub already_relayed: u64,
    pub pass_through: u64,
    pub replays: u64,
    pub snapshots_served: u64,
}

/// Trait for metrics backends
///
/// Implement this to forward relay activity to an external system such as
/// Prometheus.
pub trait MetricsRecorder: Send + Sync {
    /// A command was tagged and handed to the transport.
    fn record_relayed(&self, perspective: RelaySource, recipients: usize);

    /// One channel send completed (`delivered`) or failed.
    fn record_send(&self, delivered: bool);

    /// A value went to the next stage without being relayed.
    fn record_pass_through(&self, reason: PassReason);

    /// An inbound command was dispatched locally.
    fn record_replay(&self);

    /// The host answered a snapshot request.
    fn record_snapshot_served(&self, blocking: bool);
}

/// No-op recorder for when metrics are disabled
#[derive(Default, Debug)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_relayed(&self, _: RelaySource, _: usize) {}
    fn record_send(&self, _: bool) {}
    fn record_pass_through(&self, _: PassReason) {}
    fn record_replay(&self) {}
    fn record_snapshot_served(&self, _: bool) {}
}

impl MetricsRecorder for RelayMetrics {
    fn record_relayed(&self, _perspective: RelaySource, _recipients: usize) {
        self.relayed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_send(&self, delivered: bool) {
        if delivered {
            self.sends.fetch_add(1, Ordering::Relaxed);
        } else {
            self.send_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_pass_through(&self, reason: PassReason) {
        match reason {
            PassReason::AlreadyRelayed => self.already_relayed.fetch_add(1, Ordering::Relaxed),
            PassReason::NotCommand | PassReason::Internal => {
                self.pass_through.fetch_add(1, Ordering::Relaxed)
            }
        };
    }

    fn record_replay(&self) {
        self.replays.fetch_add(1, Ordering::Relaxed);
    }

    fn record_snapshot_served(&self, _blocking: bool) {
        self.snapshots_served.fetch_add(1, Ordering::Relaxed);
    }
}
