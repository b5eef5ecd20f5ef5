//! # Relay Runtime Binary
//!
//! Starts a host and `SR_SUBORDINATES` subordinates, runs a short scripted
//! exchange against a counter, logs the converged states and shuts down.
//!
//! ## Usage
//!
//! ```bash
//! SR_SUBORDINATES=3 SR_LOG_LEVEL=debug relay-runtime
//! ```

use anyhow::{bail, Result};
use relay_runtime::counter::{self, CounterState};
use relay_runtime::{RelayRuntime, RuntimeConfig};
use relay_telemetry::{encode_metrics, init_telemetry, PrometheusRecorder, TelemetryConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(&TelemetryConfig::from_env())?;

    info!("===========================================");
    info!("  State Relay Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = RuntimeConfig::from_env()?;
    info!(
        subordinates = config.subordinates,
        stamp_recipient = config.stamp_recipient,
        snapshot_mode = ?config.snapshot_mode,
        "Configuration loaded"
    );

    let runtime = RelayRuntime::start(
        config,
        CounterState::default(),
        counter::reduce,
        Arc::new(PrometheusRecorder),
    )
    .await?;

    let outcome = run_demo(&runtime).await;

    match encode_metrics() {
        Ok(text) => debug!(metrics = %text, "Relay metrics"),
        Err(e) => debug!(error = %e, "Metrics unavailable"),
    }

    runtime.shutdown().await;
    outcome
}

async fn run_demo(runtime: &RelayRuntime<CounterState>) -> Result<()> {
    let subordinates = runtime.subordinates();
    let (Some(first), Some(last)) = (subordinates.first(), subordinates.last()) else {
        bail!("runtime started without subordinates");
    };

    // Subordinate-originated commands reach the host only.
    first.dispatch(counter::increment());
    last.dispatch(counter::add(5));
    if !runtime
        .wait_until(|rt| rt.host().get_state().count == 6, SETTLE_TIMEOUT)
        .await
    {
        bail!("host did not apply subordinate commands in time");
    }
    info!(host = runtime.host().get_state().count, "Host applied subordinate commands");

    runtime.resync().await?;

    // Host-originated commands fan out to every subordinate.
    runtime.host().dispatch(counter::increment());
    if !runtime
        .wait_until(RelayRuntime::is_converged, SETTLE_TIMEOUT)
        .await
    {
        bail!("subordinates did not converge in time");
    }

    info!(count = runtime.host().get_state().count, "host");
    for context in runtime.subordinates() {
        info!(
            endpoint = %context.id(),
            count = context.store().get_state().count,
            "subordinate"
        );
    }
    Ok(())
}
