//! # Host Relay
//!
//! Middleware for the authoritative context.
//!
//! - Fans every fresh command out to each connected subordinate, one copy
//!   per recipient, optionally stamping the recipient id into `originId`.
//! - Replays commands arriving from subordinates. Those are already
//!   forwarded, so they are applied on the host and not re-broadcast.
//! - Answers snapshot requests (async and blocking) with a snapshot of the
//!   host store taken when the request is served.

use crate::domain::config::RelayConfig;
use crate::error::RelayError;
use crate::metrics::{MetricsRecorder, NoOpMetrics};
use crate::service::interceptor::Interceptor;
use crate::service::replay::ReplayListener;
use serde::Serialize;
use serde_json::Value;
use shared_bus::{
    register_unique, unregister, HostTransport, InboundMessage, SyncRequest, TransportError,
};
use shared_types::{
    Envelope, EndpointId, MaybeCommand, RelaySource, CHANNEL_SNAPSHOT_ASYNC,
    CHANNEL_SNAPSHOT_SYNC, CHANNEL_TO_HOST, CHANNEL_TO_SUBORDINATE,
};
use sr_01_state_container::{Middleware, Next, StoreHandle};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct HostRelay {
    transport: Arc<dyn HostTransport>,
    interceptor: Interceptor,
}

impl HostRelay {
    pub fn new(transport: Arc<dyn HostTransport>, config: RelayConfig) -> Result<Self, RelayError> {
        config.validate()?;
        Ok(Self {
            transport,
            interceptor: Interceptor::new(RelaySource::Host, config, Arc::new(NoOpMetrics)),
        })
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsRecorder>) -> Self {
        self.interceptor.metrics = metrics;
        self
    }

    /// Remove the replay listener and both snapshot handlers. Safe to call
    /// more than once.
    pub fn dispose(&self) {
        let removed = self.interceptor.disposer.dispose();
        if removed > 0 {
            info!(removed, "Host relay disposed");
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.interceptor.disposer.is_disposed()
    }

    /// Deliver `envelope` to every connected subordinate. Returns the number
    /// of successful deliveries.
    fn broadcast(&self, envelope: &Envelope) -> usize {
        let endpoints = self.transport.endpoints();
        if endpoints.is_empty() {
            debug!(kind = envelope.kind(), "No subordinates connected, applied locally only");
            return 0;
        }

        let metrics = &self.interceptor.metrics;
        let mut delivered = 0;
        for endpoint in endpoints {
            let copy = if self.interceptor.config.stamp_recipient {
                envelope.stamped(endpoint.0)
            } else {
                envelope.clone()
            };
            match self
                .transport
                .send_to(endpoint, CHANNEL_TO_SUBORDINATE, copy.into_value())
            {
                Ok(()) => {
                    metrics.record_send(true);
                    delivered += 1;
                }
                Err(e) => {
                    warn!(%endpoint, kind = envelope.kind(), error = %e, "Relay to subordinate failed");
                    metrics.record_send(false);
                }
            }
        }
        delivered
    }

    fn register_replay<S: Clone + Send + Sync + 'static>(&self, store: &StoreHandle<S>) {
        let listener = ReplayListener::new(
            store.clone(),
            RelaySource::Host,
            self.interceptor.metrics.clone(),
        )
        .into_channel_listener();
        let id = register_unique(&*self.transport, CHANNEL_TO_HOST, listener);

        let transport = self.transport.clone();
        self.interceptor.disposer.defer(move || {
            unregister(&*transport, CHANNEL_TO_HOST, id);
        });
    }

    fn register_snapshot_handlers<S>(&self, store: &StoreHandle<S>)
    where
        S: Clone + Serialize + Send + Sync + 'static,
    {
        let async_store = store.clone();
        let metrics = self.interceptor.metrics.clone();
        let async_id = self.transport.handle(
            CHANNEL_SNAPSHOT_ASYNC,
            Arc::new(move |_: &InboundMessage| -> Result<Value, TransportError> {
                let snapshot =
                    async_store
                        .snapshot()
                        .map_err(|e| TransportError::HandlerFailed {
                            channel: CHANNEL_SNAPSHOT_ASYNC.to_string(),
                            reason: e.to_string(),
                        })?;
                metrics.record_snapshot_served(false);
                Ok(snapshot)
            }),
        );

        let sync_store = store.clone();
        let metrics = self.interceptor.metrics.clone();
        let sync_id = self.transport.handle_sync(
            CHANNEL_SNAPSHOT_SYNC,
            Arc::new(move |request: &mut SyncRequest| match sync_store.snapshot() {
                Ok(snapshot) => {
                    request.set_return_value(snapshot);
                    metrics.record_snapshot_served(true);
                }
                Err(e) => {
                    warn!(sender = %request.message.sender, error = %e, "Snapshot unavailable, replying null");
                }
            }),
        );

        // A later host relay may own these channels by now.
        let transport = self.transport.clone();
        self.interceptor.disposer.defer(move || {
            transport.release_handler(CHANNEL_SNAPSHOT_ASYNC, async_id);
            transport.release_handler(CHANNEL_SNAPSHOT_SYNC, sync_id);
        });
    }
}

impl<S: Clone + Serialize + Send + Sync + 'static> Middleware<S> for HostRelay {
    fn attach(&self, store: &StoreHandle<S>) {
        if self.is_disposed() {
            warn!("Relay already disposed, host registrations skipped");
            return;
        }
        self.register_replay(store);
        self.register_snapshot_handlers(store);
        info!(
            subordinates = self.transport.endpoints().len(),
            "Host relay attached"
        );
    }

    fn handle(&self, command: MaybeCommand, next: Next<'_>) -> MaybeCommand {
        self.interceptor
            .intercept(command, next, EndpointId::HOST.0, |envelope| {
                self.broadcast(envelope)
            })
    }
}
