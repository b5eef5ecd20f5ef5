//! # Channel Registrations
//!
//! One logical listener per channel name per context. Registering a second
//! listener under the same name first removes the previous one, so building
//! a relay twice in the same context never double-dispatches inbound
//! messages.

use crate::listener::{Listener, ListenerId};
use crate::ports::ListenerRegistry;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Channel name → the listener currently registered under it.
#[derive(Debug, Default)]
pub struct ChannelRegistrations {
    entries: Mutex<HashMap<String, ListenerId>>,
}

impl ChannelRegistrations {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listener currently registered under `channel`.
    #[must_use]
    pub fn current(&self, channel: &str) -> Option<ListenerId> {
        self.entries.lock().get(channel).copied()
    }

    /// Record `id` as the listener for `channel`, returning the previous one.
    pub fn record(&self, channel: &str, id: ListenerId) -> Option<ListenerId> {
        self.entries.lock().insert(channel.to_string(), id)
    }

    /// Remove and return the registration for `channel`.
    pub fn take(&self, channel: &str) -> Option<ListenerId> {
        self.entries.lock().remove(channel)
    }

    /// Forget `channel` only if it still points at `id`.
    ///
    /// A newer registration under the same name is left alone.
    pub fn release(&self, channel: &str, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(channel) == Some(&id) {
            entries.remove(channel);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Register `listener` as the only logical listener for `channel`.
///
/// Remove-then-add: a listener previously registered through this function
/// for the same channel is removed before the new one is added.
pub fn register_unique<R>(registry: &R, channel: &str, listener: Listener) -> ListenerId
where
    R: ListenerRegistry + ?Sized,
{
    if let Some(previous) = registry.registrations().take(channel) {
        registry.remove_listener(channel, previous);
        debug!(channel, previous = previous.0, "Replaced existing registration");
    }
    let id = registry.add_listener(channel, listener);
    registry.registrations().record(channel, id);
    id
}

/// Undo [`register_unique`]. Safe to call more than once.
pub fn unregister<R>(registry: &R, channel: &str, id: ListenerId) -> bool
where
    R: ListenerRegistry + ?Sized,
{
    registry.registrations().release(channel, id);
    registry.remove_listener(channel, id)
}
