//! Prometheus metrics for the state relay.
//!
//! All metrics follow the naming convention: `sr_relay_<metric>_<unit>`
//!
//! [`PrometheusRecorder`] plugs these into a relay through
//! `with_metrics`, alongside or instead of the relay's own atomic counters.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use shared_types::RelaySource;
use sr_02_action_relay::{MetricsRecorder, PassReason};

use crate::TelemetryError;

lazy_static! {
    /// Registry holding every relay metric
    pub static ref REGISTRY: Registry = Registry::new();

    /// Commands tagged and handed to the transport, by side
    pub static ref COMMANDS_RELAYED: CounterVec = CounterVec::new(
        Opts::new("sr_relay_commands_relayed_total", "Commands relayed across the boundary"),
        &["perspective"]
    ).expect("metric creation failed");

    /// Individual channel sends, by outcome (delivered/failed)
    pub static ref CHANNEL_SENDS: CounterVec = CounterVec::new(
        Opts::new("sr_relay_channel_sends_total", "Channel sends issued by the relay"),
        &["outcome"]
    ).expect("metric creation failed");

    /// Values not relayed, by reason
    pub static ref PASS_THROUGH: CounterVec = CounterVec::new(
        Opts::new("sr_relay_pass_through_total", "Dispatched values passed through without relay"),
        &["reason"]
    ).expect("metric creation failed");

    /// Inbound commands dispatched locally
    pub static ref REPLAYS: Counter = Counter::new(
        "sr_relay_replays_total",
        "Inbound commands replayed into the local store"
    ).expect("metric creation failed");

    /// Snapshot requests answered by the host, by mode (sync/async)
    pub static ref SNAPSHOTS_SERVED: CounterVec = CounterVec::new(
        Opts::new("sr_relay_snapshots_served_total", "Snapshot requests answered"),
        &["mode"]
    ).expect("metric creation failed");

    /// Recipients per relayed command
    pub static ref FANOUT_RECIPIENTS: Histogram = Histogram::with_opts(
        HistogramOpts::new("sr_relay_fanout_recipients", "Recipients per relayed command")
            .buckets(vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0])
    ).expect("metric creation failed");
}

/// Register all relay metrics with [`REGISTRY`].
///
/// Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(COMMANDS_RELAYED.clone()),
        Box::new(CHANNEL_SENDS.clone()),
        Box::new(PASS_THROUGH.clone()),
        Box::new(REPLAYS.clone()),
        Box::new(SNAPSHOTS_SERVED.clone()),
        Box::new(FANOUT_RECIPIENTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Relay metrics recorder backed by the Prometheus metrics above.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusRecorder;

impl MetricsRecorder for PrometheusRecorder {
    fn record_relayed(&self, perspective: RelaySource, recipients: usize) {
        COMMANDS_RELAYED
            .with_label_values(&[perspective.as_str()])
            .inc();
        FANOUT_RECIPIENTS.observe(recipients as f64);
    }

    fn record_send(&self, delivered: bool) {
        let outcome = if delivered { "delivered" } else { "failed" };
        CHANNEL_SENDS.with_label_values(&[outcome]).inc();
    }

    fn record_pass_through(&self, reason: PassReason) {
        PASS_THROUGH.with_label_values(&[reason.as_str()]).inc();
    }

    fn record_replay(&self) {
        REPLAYS.inc();
    }

    fn record_snapshot_served(&self, blocking: bool) {
        let mode = if blocking { "sync" } else { "async" };
        SNAPSHOTS_SERVED.with_label_values(&[mode]).inc();
    }
}
