//! # Relay Flows
//!
//! Cross-crate command flows over a hand-pumped topology:
//!
//! 1. **Send hooks**: `before_send` shapes what crosses the boundary,
//!    `after_send` only what the local store sees
//! 2. **Internal prefix**: a custom prefix replaces the default
//! 3. **Origin stamping**: on and off
//! 4. **Disposal**: a disposed host stops applying subordinate commands
//! 5. **Telemetry**: the Prometheus recorder counts a full exchange

#[cfg(test)]
mod tests {
    use crate::fixtures::{add, Topology};
    use parking_lot::Mutex;
    use relay_telemetry::metrics::{CHANNEL_SENDS, COMMANDS_RELAYED, REPLAYS};
    use relay_telemetry::PrometheusRecorder;
    use serde_json::json;
    use shared_bus::{InboundMessage, ListenerRegistry, SubordinateTransport};
    use shared_types::{Command, RelayMeta, RelaySource, CHANNEL_TO_SUBORDINATE};
    use sr_02_action_relay::{RelayConfig, RelayConfigBuilder};
    use std::sync::Arc;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    /// Relay metadata of every host → subordinate message `port` receives.
    fn wiretap(topology: &Topology, index: usize) -> Arc<Mutex<Vec<RelayMeta>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        topology.replicas[index].port.add_listener(
            CHANNEL_TO_SUBORDINATE,
            Arc::new(move |message: &InboundMessage| {
                let meta = serde_json::from_value::<Command>(message.payload.clone())
                    .ok()
                    .and_then(|command| RelayMeta::read(&command));
                if let Some(meta) = meta {
                    sink.lock().push(meta);
                }
            }),
        );
        seen
    }

    // =========================================================================
    // SEND HOOKS
    // =========================================================================

    #[test]
    fn test_before_send_hook_applies_to_both_sides() {
        let config = RelayConfigBuilder::new()
            .before_send(|command: Command| {
                let doubled = command.payload.as_i64().map(|n| n * 2);
                match doubled {
                    Some(n) => command.with_payload(json!(n)),
                    None => command,
                }
            })
            .build()
            .unwrap();
        let topology = Topology::new(1, config).unwrap();
        let replica = &topology.replicas[0];

        replica.store.dispatch(add(3));
        topology.settle();

        assert_eq!(replica.store.get_state().total, 6);
        assert_eq!(topology.host.get_state().total, 6);
    }

    #[test]
    fn test_after_send_hook_is_local_only() {
        let config = RelayConfigBuilder::new()
            .after_send(|command: Command| command.with_payload(json!(100)))
            .build()
            .unwrap();
        let topology = Topology::new(1, config).unwrap();
        let replica = &topology.replicas[0];

        replica.store.dispatch(add(1));
        topology.settle();

        assert_eq!(replica.store.get_state().total, 100);
        assert_eq!(topology.host.get_state().total, 1);
    }

    // =========================================================================
    // INTERNAL PREFIX
    // =========================================================================

    #[test]
    fn test_custom_internal_prefix() {
        let config = RelayConfigBuilder::new()
            .internal_prefix("sys:")
            .build()
            .unwrap();
        let topology = Topology::new(1, config).unwrap();
        topology.settle();
        let replica = &topology.replicas[0];

        replica.store.dispatch(Command::new("sys:ping"));
        assert_eq!(topology.hub.pump(), 0);

        // The default prefix is no longer special.
        replica.store.dispatch(Command::new("@@custom"));
        assert_eq!(topology.hub.pump(), 1);
        assert_eq!(topology.host.get_state().applied, vec!["@@custom"]);
    }

    // =========================================================================
    // ORIGIN STAMPING
    // =========================================================================

    #[test]
    fn test_host_stamps_each_recipient() {
        let topology = Topology::new(2, RelayConfig::default()).unwrap();
        let taps = [wiretap(&topology, 0), wiretap(&topology, 1)];

        topology.host.dispatch(add(1));
        topology.settle();

        for (index, tap) in taps.iter().enumerate() {
            let seen = tap.lock();
            assert_eq!(seen.len(), 1);
            assert!(seen[0].forwarded);
            assert_eq!(seen[0].source, RelaySource::Host);
            assert_eq!(
                seen[0].origin_id,
                topology.replicas[index].port.endpoint_id().0
            );
        }
    }

    #[test]
    fn test_unstamped_host_sends_host_origin() {
        let config = RelayConfigBuilder::new()
            .stamp_recipient(false)
            .build()
            .unwrap();
        let topology = Topology::new(2, config).unwrap();
        let tap = wiretap(&topology, 1);

        topology.host.dispatch(add(1));
        topology.settle();

        assert_eq!(tap.lock()[0].origin_id, 0);
        assert!(topology
            .replicas
            .iter()
            .all(|r| r.store.get_state().total == 1));
    }

    // =========================================================================
    // DISPOSAL
    // =========================================================================

    #[test]
    fn test_disposed_host_ignores_subordinate_commands() {
        let topology = Topology::new(1, RelayConfig::default()).unwrap();
        let replica = &topology.replicas[0];

        topology.host_relay.dispose();
        replica.store.dispatch(add(2));
        topology.settle();

        assert_eq!(replica.store.get_state().total, 2);
        assert_eq!(topology.host.get_state().total, 0);
    }

    #[test]
    fn test_disposed_subordinate_keeps_working_locally() {
        let topology = Topology::new(2, RelayConfig::default()).unwrap();
        let replica = &topology.replicas[0];

        replica.relay.dispose();
        replica.store.dispatch(add(5));
        topology.host.dispatch(add(1));
        topology.settle();

        // No send, no replay.
        assert_eq!(replica.store.get_state().total, 5);
        assert_eq!(topology.host.get_state().total, 1);
        assert_eq!(topology.replicas[1].store.get_state().total, 1);
    }

    // =========================================================================
    // TELEMETRY
    // =========================================================================

    #[test]
    fn test_prometheus_recorder_counts_exchange() {
        let topology =
            Topology::with_metrics(2, RelayConfig::default(), Arc::new(PrometheusRecorder))
                .unwrap();
        let relayed_before = COMMANDS_RELAYED.with_label_values(&["host"]).get();
        let sends_before = CHANNEL_SENDS.with_label_values(&["delivered"]).get();
        let replays_before = REPLAYS.get();

        topology.host.dispatch(add(1));
        topology.settle();

        // Other tests share the registry, so only lower bounds hold.
        assert!(COMMANDS_RELAYED.with_label_values(&["host"]).get() >= relayed_before + 1.0);
        assert!(CHANNEL_SENDS.with_label_values(&["delivered"]).get() >= sends_before + 2.0);
        assert!(REPLAYS.get() >= replays_before + 2.0);
    }
}
