//! # Listeners
//!
//! Listener bookkeeping shared by both ends of the in-memory transport.
//! A listener is identified by the [`ListenerId`] handed out when it was
//! added; removal is by id, never by comparing closures.

use serde_json::Value;
use shared_types::EndpointId;
use std::collections::HashMap;
use std::sync::Arc;

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// A message delivered to a listener or request handler.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Endpoint that sent the message.
    pub sender: EndpointId,
    /// Channel the message arrived on.
    pub channel: String,
    pub payload: Value,
}

/// Callback invoked for every message on a channel.
pub type Listener = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Per-channel listener lists.
#[derive(Default)]
pub struct ListenerTable {
    next_id: u64,
    channels: HashMap<String, Vec<(ListenerId, Listener)>>,
}

impl ListenerTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, channel: &str, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.channels
            .entry(channel.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove(&mut self, channel: &str, id: ListenerId) -> bool {
        let Some(entries) = self.channels.get_mut(channel) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.channels.remove(channel);
        }
        removed
    }

    /// Listeners for `channel`, in registration order.
    ///
    /// Returned as owned handles so callers can invoke them without holding
    /// the table lock.
    #[must_use]
    pub fn listeners_for(&self, channel: &str) -> Vec<Listener> {
        self.channels
            .get(channel)
            .map(|entries| entries.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }
}
