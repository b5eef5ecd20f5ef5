//! # Test Fixtures
//!
//! A host and N subordinates over one [`InMemoryHub`], with no delivery
//! loops running. Tests decide when each side processes its queue.

use serde::{Deserialize, Serialize};
use shared_bus::{InMemoryHub, InMemoryPort};
use shared_types::Command;
use sr_01_state_container::Store;
use sr_02_action_relay::{
    install_bridge, HostRelay, IsolatedGlobals, MetricsRecorder, NoOpMetrics, RelayConfig,
    RelayError, SubordinateRelay,
};
use std::sync::Arc;

/// Demo state: a running total plus every other kind applied, in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub total: i64,
    pub applied: Vec<String>,
}

/// `tally/add` adds an integer payload. Other kinds are logged, except the
/// store's own housekeeping.
pub fn tally_reducer(state: &Tally, command: &Command) -> Tally {
    let mut next = state.clone();
    if command.kind == "tally/add" {
        next.total += command.payload.as_i64().unwrap_or(0);
    } else if !command.kind.starts_with("@@store/") {
        next.applied.push(command.kind.clone());
    }
    next
}

#[must_use]
pub fn add(amount: i64) -> Command {
    Command::new("tally/add").with_payload(serde_json::json!(amount))
}

pub struct Replica {
    pub port: InMemoryPort,
    pub globals: IsolatedGlobals,
    pub relay: Arc<SubordinateRelay>,
    pub store: Store<Tally>,
}

pub struct Topology {
    pub hub: InMemoryHub,
    pub host_relay: Arc<HostRelay>,
    pub host: Store<Tally>,
    pub replicas: Vec<Replica>,
}

impl Topology {
    pub fn new(subordinates: usize, config: RelayConfig) -> Result<Self, RelayError> {
        Self::with_metrics(subordinates, config, Arc::new(NoOpMetrics))
    }

    pub fn with_metrics(
        subordinates: usize,
        config: RelayConfig,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Result<Self, RelayError> {
        let hub = InMemoryHub::new();
        let host_relay = Arc::new(
            HostRelay::new(Arc::new(hub.clone()), config.clone())?.with_metrics(metrics.clone()),
        );
        let host = Store::builder(Tally::default(), tally_reducer)
            .middleware(host_relay.clone())
            .build();

        let mut replicas = Vec::with_capacity(subordinates);
        for _ in 0..subordinates {
            let port = hub.connect();
            let globals = IsolatedGlobals::new();
            install_bridge(&globals, Arc::new(port.clone()));
            let relay = Arc::new(
                SubordinateRelay::from_globals(&globals, config.clone())?
                    .with_metrics(metrics.clone()),
            );
            let store = Store::builder(Tally::default(), tally_reducer)
                .middleware(relay.clone())
                .build();
            replicas.push(Replica {
                port,
                globals,
                relay,
                store,
            });
        }

        Ok(Self {
            hub,
            host_relay,
            host,
            replicas,
        })
    }

    pub fn pump_subordinates(&self) -> usize {
        self.replicas.iter().map(|r| r.port.pump()).sum()
    }

    /// Pump every side until no queue has work left.
    pub fn settle(&self) -> usize {
        let mut total = 0;
        loop {
            let delivered = self.hub.pump() + self.pump_subordinates();
            if delivered == 0 {
                return total;
            }
            total += delivered;
        }
    }
}
