//! Send hooks.
//!
//! `before_send` runs on the untagged envelope, before it is marked
//! forwarded. `after_send` runs on the forwarded envelope after the send;
//! its result is what the local pipeline continues with. Hooks only see the
//! command, never the relay metadata.

use shared_types::{Command, Envelope};
use std::fmt;
use std::sync::Arc;

/// Transform applied to a command around a relay send.
pub type CommandHook = Arc<dyn Fn(Command) -> Command + Send + Sync>;

#[derive(Clone, Default)]
pub struct SendHooks {
    pub before_send: Option<CommandHook>,
    pub after_send: Option<CommandHook>,
}

impl SendHooks {
    #[must_use]
    pub fn apply_before_send(&self, envelope: Envelope) -> Envelope {
        apply(self.before_send.as_ref(), envelope)
    }

    #[must_use]
    pub fn apply_after_send(&self, envelope: Envelope) -> Envelope {
        apply(self.after_send.as_ref(), envelope)
    }
}

fn apply(hook: Option<&CommandHook>, envelope: Envelope) -> Envelope {
    match hook {
        Some(hook) => envelope.map_command(|command| hook(command)),
        None => envelope,
    }
}

impl fmt::Debug for SendHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendHooks")
            .field("before_send", &self.before_send.is_some())
            .field("after_send", &self.after_send.is_some())
            .finish()
    }
}
