//! # Replay Listener
//!
//! Injects commands arriving over the channel into the local store. It
//! never inspects relay metadata: loop prevention belongs to the
//! interceptor that sees the command on its way back out.

use crate::metrics::MetricsRecorder;
use crate::ports::outbound::CommandListener;
use shared_bus::{InboundMessage, Listener};
use shared_types::{MaybeCommand, RelaySource};
use sr_01_state_container::StoreHandle;
use std::sync::Arc;
use tracing::{debug, trace};

pub struct ReplayListener<S> {
    store: StoreHandle<S>,
    perspective: RelaySource,
    metrics: Arc<dyn MetricsRecorder>,
}

impl<S: Clone + Send + Sync + 'static> ReplayListener<S> {
    pub fn new(
        store: StoreHandle<S>,
        perspective: RelaySource,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            store,
            perspective,
            metrics,
        }
    }

    /// Dispatch `command` into the local store.
    pub fn replay(&self, command: MaybeCommand) {
        trace!(perspective = self.perspective.as_str(), kind = ?command.kind(), "Replaying inbound command");
        match self.store.dispatch(command) {
            Ok(_) => self.metrics.record_replay(),
            Err(e) => debug!(perspective = self.perspective.as_str(), error = %e, "Inbound command dropped"),
        }
    }

    /// As a bridge listener (subordinate side).
    pub fn into_command_listener(self) -> CommandListener {
        Arc::new(move |command: MaybeCommand| self.replay(command))
    }

    /// As a raw channel listener (host side). The payload is parsed first.
    pub fn into_channel_listener(self) -> Listener {
        Arc::new(move |message: &InboundMessage| {
            self.replay(MaybeCommand::parse(message.payload.clone()))
        })
    }
}
