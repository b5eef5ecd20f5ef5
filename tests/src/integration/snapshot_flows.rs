//! # Snapshot Flows
//!
//! Initial-state fetch and hydration across crates:
//!
//! - blocking fetch answered by a host pumped on another thread
//! - async hydration of a replica that missed earlier commands
//! - missing handler and undecodable state
//! - a second host relay taking over the snapshot channels, and keeping
//!   them after the first is disposed

#[cfg(test)]
mod tests {
    use crate::fixtures::{add, tally_reducer, Tally, Topology};
    use relay_telemetry::metrics::SNAPSHOTS_SERVED;
    use relay_telemetry::PrometheusRecorder;
    use shared_bus::{InMemoryHub, TransportError};
    use shared_types::CHANNEL_SNAPSHOT_SYNC;
    use sr_01_state_container::{Store, StoreError};
    use sr_02_action_relay::{
        fetch_initial_state, hydrate_from_host, install_bridge, CommandBridge, HostRelay,
        IsolatedGlobals, RelayConfig, RelayError,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tokio::time::timeout;

    /// Pump `hub` on the current thread until `work` finishes on another.
    fn with_host_pumping<T: Send + 'static>(
        hub: &InMemoryHub,
        work: impl FnOnce() -> T + Send + 'static,
    ) -> T {
        let done = Arc::new(AtomicBool::new(false));
        let finished = done.clone();
        let worker = thread::spawn(move || {
            let result = work();
            finished.store(true, Ordering::SeqCst);
            result
        });
        while !done.load(Ordering::SeqCst) {
            hub.pump();
            thread::sleep(Duration::from_millis(1));
        }
        worker.join().unwrap()
    }

    #[test]
    fn test_blocking_fetch_sees_host_state() {
        let topology =
            Topology::with_metrics(1, RelayConfig::default(), Arc::new(PrometheusRecorder))
                .unwrap();
        topology.host.dispatch(add(4));
        topology.host.dispatch(add(5));
        topology.settle();
        let served_before = SNAPSHOTS_SERVED.with_label_values(&["sync"]).get();

        let bridge = topology.replicas[0].relay.bridge().clone();
        let fetched =
            with_host_pumping(&topology.hub, move || fetch_initial_state::<Tally>(&*bridge));

        assert_eq!(fetched.unwrap(), topology.host.get_state());
        assert!(SNAPSHOTS_SERVED.with_label_values(&["sync"]).get() >= served_before + 1.0);
    }

    #[tokio::test]
    async fn test_late_replica_hydrates_over_async_snapshot() {
        let topology = Topology::new(1, RelayConfig::default()).unwrap();
        topology.host.dispatch(add(2));
        topology.host.dispatch(add(3));
        topology.settle();

        // Connected after the host's commands went out.
        let port = topology.hub.connect();
        let globals = IsolatedGlobals::new();
        let bridge = install_bridge(&globals, Arc::new(port.clone()));
        let late = Store::builder(Tally::default(), tally_reducer).build();

        let hub = topology.hub.clone();
        let pump = tokio::spawn(async move {
            for _ in 0..200 {
                hub.pump();
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });
        timeout(Duration::from_secs(1), hydrate_from_host(&late, &*bridge))
            .await
            .expect("hydrate timed out")
            .unwrap();
        pump.abort();

        assert_eq!(late.get_state(), topology.host.get_state());
        assert_eq!(late.get_state().total, 5);
    }

    #[test]
    fn test_fetch_without_host_relay_reports_missing_handler() {
        let hub = InMemoryHub::new();
        let globals = IsolatedGlobals::new();
        let bridge = install_bridge(&globals, Arc::new(hub.connect()));

        let fetched = with_host_pumping(&hub, move || fetch_initial_state::<Tally>(&*bridge));

        assert!(matches!(
            fetched,
            Err(RelayError::Transport(TransportError::NoHandler { channel }))
                if channel == CHANNEL_SNAPSHOT_SYNC
        ));
    }

    #[test]
    fn test_undecodable_snapshot_is_a_store_error() {
        let topology = Topology::new(1, RelayConfig::default()).unwrap();
        let bridge = topology.replicas[0].relay.bridge().clone();

        let fetched =
            with_host_pumping(&topology.hub, move || fetch_initial_state::<Vec<u8>>(&*bridge));

        assert!(matches!(
            fetched,
            Err(RelayError::Store(StoreError::Hydrate(_)))
        ));
    }

    #[test]
    fn test_second_host_relay_takes_over_snapshots() {
        let topology = Topology::new(1, RelayConfig::default()).unwrap();
        topology.host.dispatch(add(1));
        topology.settle();

        let successor_relay =
            Arc::new(HostRelay::new(Arc::new(topology.hub.clone()), RelayConfig::default()).unwrap());
        let successor = Store::builder(
            Tally {
                total: 42,
                applied: Vec::new(),
            },
            tally_reducer,
        )
        .middleware(successor_relay.clone())
        .build();

        // Retiring the original relay must leave the successor's handlers.
        topology.host_relay.dispose();

        let bridge: Arc<dyn CommandBridge> = topology.replicas[0].relay.bridge().clone();
        let fetched =
            with_host_pumping(&topology.hub, move || fetch_initial_state::<Tally>(&*bridge));

        assert_eq!(fetched.unwrap(), successor.get_state());
    }
}
