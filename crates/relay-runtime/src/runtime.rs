//! # Relay Runtime
//!
//! Owns one host store, N subordinate stores and the delivery loops that
//! connect them.
//!
//! ```text
//! ┌──────────────── RelayRuntime ────────────────┐
//! │  host Store ── HostRelay ── InMemoryHub.run  │
//! │                                  │           │
//! │        ┌──────────────┬──────────┘           │
//! │   InMemoryPort.run  InMemoryPort.run   ...   │
//! │   SubordinateRelay  SubordinateRelay         │
//! │   Store             Store                    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Startup order per subordinate: connect, install the bridge, obtain the
//! host's state, build the store with the relay middleware. Delivery loops
//! for the ports start only once every subordinate is wired.

use crate::config::{ConfigError, RuntimeConfig, SnapshotMode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::{HostTransport, InMemoryHub, InMemoryPort, SubordinateTransport};
use shared_types::{Command, EndpointId, MaybeCommand};
use sr_01_state_container::Store;
use sr_02_action_relay::{
    fetch_initial_state, hydrate_from_host, install_bridge, HostRelay, IsolatedGlobals,
    MetricsRecorder, RelayConfig, RelayError, SubordinateRelay,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

type SharedReducer<S> = Arc<dyn Fn(&S, &Command) -> S + Send + Sync>;

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// One subordinate context: its port, relay and replica store.
pub struct SubordinateContext<S> {
    port: InMemoryPort,
    relay: Arc<SubordinateRelay>,
    store: Store<S>,
}

impl<S: Clone + Send + Sync + 'static> SubordinateContext<S> {
    #[must_use]
    pub fn id(&self) -> EndpointId {
        self.port.endpoint_id()
    }

    #[must_use]
    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    #[must_use]
    pub fn relay(&self) -> &Arc<SubordinateRelay> {
        &self.relay
    }

    pub fn dispatch(&self, command: impl Into<MaybeCommand>) -> MaybeCommand {
        self.store.dispatch(command)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.port.is_connected()
    }
}

/// Host plus subordinates, running on the current tokio runtime.
pub struct RelayRuntime<S> {
    config: RuntimeConfig,
    hub: InMemoryHub,
    host_relay: Arc<HostRelay>,
    host: Store<S>,
    subordinates: Vec<SubordinateContext<S>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S> RelayRuntime<S>
where
    S: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Wire the host and `config.subordinates` subordinates and start the
    /// delivery loops.
    pub async fn start<R>(
        config: RuntimeConfig,
        initial: S,
        reducer: R,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Result<Self, RuntimeError>
    where
        R: Fn(&S, &Command) -> S + Send + Sync + 'static,
    {
        config.validate()?;
        let relay_config = config.relay_config()?;
        let reducer: SharedReducer<S> = Arc::new(reducer);

        let hub = InMemoryHub::new();
        let host_relay = Arc::new(
            HostRelay::new(Arc::new(hub.clone()), relay_config.clone())?
                .with_metrics(metrics.clone()),
        );
        let host = Store::builder(initial.clone(), share(&reducer))
            .middleware(host_relay.clone())
            .build();

        let host_loop = hub.clone();
        let mut tasks = vec![tokio::spawn(async move { host_loop.run().await })];

        let mut subordinates = Vec::with_capacity(config.subordinates);
        for _ in 0..config.subordinates {
            let wired = connect_subordinate(
                &hub,
                config.snapshot_mode,
                &relay_config,
                &reducer,
                &metrics,
                initial.clone(),
            )
            .await;
            match wired {
                Ok(context) => subordinates.push(context),
                Err(e) => {
                    host_relay.dispose();
                    hub.close();
                    return Err(e);
                }
            }
        }

        for context in &subordinates {
            let port = context.port.clone();
            tasks.push(tokio::spawn(async move { port.run().await }));
        }

        info!(
            subordinates = subordinates.len(),
            snapshot_mode = ?config.snapshot_mode,
            "Relay runtime started"
        );

        Ok(Self {
            config,
            hub,
            host_relay,
            host,
            subordinates,
            tasks,
        })
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &Store<S> {
        &self.host
    }

    #[must_use]
    pub fn subordinates(&self) -> &[SubordinateContext<S>] {
        &self.subordinates
    }

    #[must_use]
    pub fn subordinate(&self, index: usize) -> Option<&SubordinateContext<S>> {
        self.subordinates.get(index)
    }

    /// Endpoints the host currently fans out to.
    #[must_use]
    pub fn endpoints(&self) -> Vec<EndpointId> {
        self.hub.endpoints()
    }

    /// True if every subordinate holds the host's state.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        let host = self.host.get_state();
        self.subordinates
            .iter()
            .all(|context| context.store.get_state() == host)
    }

    /// Poll `condition` until it holds or `timeout` elapses.
    pub async fn wait_until(&self, condition: impl Fn(&Self) -> bool, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if condition(self) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Replace every subordinate's state with the host's.
    ///
    /// Commands a subordinate originates reach the host only, so sibling
    /// subordinates drift until they are re-synced.
    pub async fn resync(&self) -> Result<(), RuntimeError> {
        for context in &self.subordinates {
            hydrate_from_host(&context.store, &**context.relay.bridge()).await?;
        }
        debug!(subordinates = self.subordinates.len(), "Subordinates re-synced");
        Ok(())
    }

    /// Dispose every relay, stop the delivery loops and wait for them.
    pub async fn shutdown(self) {
        info!("Initiating relay runtime shutdown");

        for context in &self.subordinates {
            context.relay.dispose();
        }
        self.host_relay.dispose();

        for context in &self.subordinates {
            context.port.disconnect();
        }
        self.hub.close();

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Delivery loop ended abnormally");
            }
        }

        info!("Relay runtime shutdown complete");
    }
}

async fn connect_subordinate<S>(
    hub: &InMemoryHub,
    snapshot_mode: SnapshotMode,
    relay_config: &RelayConfig,
    reducer: &SharedReducer<S>,
    metrics: &Arc<dyn MetricsRecorder>,
    initial: S,
) -> Result<SubordinateContext<S>, RuntimeError>
where
    S: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let port = hub.connect();
    let globals = IsolatedGlobals::new();
    let bridge = install_bridge(&globals, Arc::new(port.clone()));

    let state = match snapshot_mode {
        SnapshotMode::Sync => {
            // Blocks until the host loop answers, so keep it off the runtime.
            let bridge = bridge.clone();
            tokio::task::spawn_blocking(move || fetch_initial_state::<S>(&*bridge))
                .await
                .map_err(|e| RuntimeError::Task(e.to_string()))??
        }
        SnapshotMode::Async => initial,
    };

    let relay = Arc::new(
        SubordinateRelay::from_globals(&globals, relay_config.clone())?
            .with_metrics(metrics.clone()),
    );
    let store = Store::builder(state, share(reducer))
        .middleware(relay.clone())
        .build();

    if snapshot_mode == SnapshotMode::Async {
        hydrate_from_host(&store, &*bridge).await?;
    }

    debug!(endpoint = %port.endpoint_id(), "Subordinate wired");
    Ok(SubordinateContext { port, relay, store })
}

fn share<S: 'static>(reducer: &SharedReducer<S>) -> impl Fn(&S, &Command) -> S + Send + Sync + 'static {
    let reducer = reducer.clone();
    move |state: &S, command: &Command| reducer(state, command)
}
