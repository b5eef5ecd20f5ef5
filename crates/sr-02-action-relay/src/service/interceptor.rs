//! Interception steps shared by the host and subordinate relays.
//!
//! ```text
//! classify ─┬─ PassThrough ───────────────────────────────────────→ next
//!           └─ Relay ─→ before_send ─→ mark_forwarded ─→ send ─→ after_send ─→ next
//! ```
//!
//! A send failure is logged and counted; the command still reaches `next`.

use crate::domain::config::RelayConfig;
use crate::domain::tagger::{classify, Disposition};
use crate::metrics::MetricsRecorder;
use crate::service::lifecycle::Disposer;
use shared_types::{Envelope, MaybeCommand, RelaySource};
use sr_01_state_container::Next;
use std::sync::Arc;
use tracing::debug;

pub(crate) struct Interceptor {
    pub(crate) perspective: RelaySource,
    pub(crate) config: RelayConfig,
    pub(crate) metrics: Arc<dyn MetricsRecorder>,
    pub(crate) disposer: Disposer,
}

impl Interceptor {
    pub(crate) fn new(
        perspective: RelaySource,
        config: RelayConfig,
        metrics: Arc<dyn MetricsRecorder>,
    ) -> Self {
        Self {
            perspective,
            config,
            metrics,
            disposer: Disposer::new(),
        }
    }

    /// Run one dispatched value through the relay.
    ///
    /// `send` receives the forwarded envelope and returns how many
    /// recipients it was handed to.
    pub(crate) fn intercept(
        &self,
        command: MaybeCommand,
        next: Next<'_>,
        origin_id: u32,
        send: impl FnOnce(&Envelope) -> usize,
    ) -> MaybeCommand {
        // A disposed relay no longer talks to the channel.
        if self.disposer.is_disposed() {
            return next(command);
        }

        let envelope = match classify(command, &self.config.internal_prefix, self.perspective) {
            Disposition::PassThrough { command, reason } => {
                debug!(
                    perspective = self.perspective.as_str(),
                    kind = ?command.kind(),
                    reason = reason.as_str(),
                    "Passing through without relay"
                );
                self.metrics.record_pass_through(reason);
                return next(command);
            }
            Disposition::Relay(envelope) => envelope,
        };

        let envelope = self
            .config
            .hooks
            .apply_before_send(envelope)
            .mark_forwarded(self.perspective, origin_id);
        let recipients = send(&envelope);
        self.metrics.record_relayed(self.perspective, recipients);

        let envelope = self.config.hooks.apply_after_send(envelope);
        next(MaybeCommand::Valid(envelope.into_command()))
    }
}
