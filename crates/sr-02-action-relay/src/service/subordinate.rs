//! # Subordinate Relay
//!
//! Middleware for a subordinate context. Relays every fresh command to the
//! host through the [`CommandBridge`] and lets it continue locally, and
//! replays commands the host relays back.
//!
//! ```text
//! dispatch ──→ [SubordinateRelay] ──next──→ reducer
//!                     │ send_command
//!                     ▼
//!                   host
//!                     │ command listener
//!                     ▼
//!               ReplayListener ──→ dispatch (passes through: forwarded)
//! ```

use crate::adapters::bridge::{IsolatedGlobals, INSTALL_STEP};
use crate::domain::config::RelayConfig;
use crate::error::RelayError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::ports::outbound::CommandBridge;
use crate::service::interceptor::Interceptor;
use crate::service::replay::ReplayListener;
use shared_types::{EndpointId, MaybeCommand, RelaySource, BRIDGE_GLOBAL_KEY};
use sr_01_state_container::{Middleware, Next, StoreHandle};
use std::sync::Arc;
use tracing::{info, warn};

pub struct SubordinateRelay {
    bridge: Arc<dyn CommandBridge>,
    interceptor: Interceptor,
}

impl SubordinateRelay {
    /// Build a relay over an explicitly passed bridge.
    pub fn new(bridge: Arc<dyn CommandBridge>, config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;
        Ok(Self {
            bridge,
            interceptor: Interceptor::new(RelaySource::Subordinate, config, Arc::new(NoOpMetrics)),
        })
    }

    /// Build a relay over the bridge installed in `globals`.
    ///
    /// Fails with [`RelayError::BridgeNotInstalled`] if the isolated context
    /// was never set up with [`install_bridge`](crate::install_bridge).
    pub fn from_globals(globals: &IsolatedGlobals, config: RelayConfig) -> Result<Self, RelayError> {
        let bridge = globals
            .lookup(BRIDGE_GLOBAL_KEY)
            .ok_or_else(|| RelayError::BridgeNotInstalled {
                key: BRIDGE_GLOBAL_KEY.to_string(),
                step: INSTALL_STEP.to_string(),
            })?;
        Self::new(bridge, config)
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.interceptor.metrics = metrics;
        self
    }

    #[must_use]
    pub fn endpoint_id(&self) -> EndpointId {
        self.bridge.endpoint_id()
    }

    #[must_use]
    pub fn bridge(&self) -> &Arc<dyn CommandBridge> {
        &self.bridge
    }

    /// Remove the replay listener. Safe to call more than once.
    pub fn dispose(&self) {
        let removed = self.interceptor.disposer.dispose();
        if removed > 0 {
            info!(endpoint = %self.endpoint_id(), removed, "Subordinate relay disposed");
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.interceptor.disposer.is_disposed()
    }
}

impl<S: Clone + Send + Sync + 'static> Middleware<S> for SubordinateRelay {
    fn attach(&self, store: &StoreHandle<S>) {
        if self.is_disposed() {
            warn!(endpoint = %self.endpoint_id(), "Relay already disposed, replay listener not registered");
            return;
        }

        let metrics = self.interceptor.metrics.clone();
        let listener = ReplayListener::new(store.clone(), RelaySource::Subordinate, metrics)
            .into_command_listener();
        let id = self.bridge.add_command_listener(listener);

        let bridge = self.bridge.clone();
        self.interceptor.disposer.defer(move || {
            bridge.remove_command_listener(id);
        });
        info!(endpoint = %self.endpoint_id(), "Subordinate relay attached");
    }

    fn handle(&self, command: MaybeCommand, next: Next<'_>) -> MaybeCommand {
        let origin = self.bridge.endpoint_id();
        self.interceptor.intercept(command, next, origin.0, |envelope| {
            match self.bridge.send_command(envelope.clone()) {
                Ok(()) => {
                    self.interceptor.metrics.record_send(true);
                    1
                }
                Err(e) => {
                    warn!(endpoint = %origin, kind = envelope.kind(), error = %e, "Relay to host failed");
                    self.interceptor.metrics.record_send(false);
                    0
                }
            }
        })
    }
}
