//! # Envelope Tagger
//!
//! Pure functions deciding what an interceptor does with a dispatched value.
//!
//! ```text
//! MaybeCommand ──→ not a command? ──────────────→ PassThrough(NotCommand)
//!                  internal prefix? ────────────→ PassThrough(Internal)
//!                  to_envelope → already relayed? → PassThrough(AlreadyRelayed)
//!                  otherwise ───────────────────→ Relay(envelope)
//! ```

use shared_types::{Command, Envelope, MaybeCommand, RelayMeta, RelaySource};

/// Attach untagged relay metadata to `command`.
///
/// A command that already carries relay metadata is wrapped as-is, so
/// `to_envelope(to_envelope(c).into_command()) == to_envelope(c)`.
#[must_use]
pub fn to_envelope(command: Command) -> Envelope {
    Envelope::from_tagged(command)
        .unwrap_or_else(|command| Envelope::from_parts(command, RelayMeta::UNTAGGED))
}

/// True if `perspective` must not relay `envelope`.
///
/// `forwarded` is the primary gate. An envelope whose `source` is the
/// perspective itself is also skipped: it is that side's own echo.
#[must_use]
pub fn is_already_relayed(envelope: &Envelope, perspective: RelaySource) -> bool {
    let relay = envelope.relay();
    relay.forwarded || relay.source == perspective
}

/// Why a value was not relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassReason {
    /// No usable discriminator.
    NotCommand,
    /// Discriminator carries the state container's housekeeping prefix.
    Internal,
    /// Already crossed the boundary, or is this side's own echo.
    AlreadyRelayed,
}

impl PassReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PassReason::NotCommand => "not_command",
            PassReason::Internal => "internal",
            PassReason::AlreadyRelayed => "already_relayed",
        }
    }
}

/// Outcome of [`classify`].
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Hand `command` to the next stage without sending anything.
    PassThrough {
        command: MaybeCommand,
        reason: PassReason,
    },
    /// Send across the boundary, then hand to the next stage.
    Relay(Envelope),
}

/// Decide whether `perspective` relays `command`.
#[must_use]
pub fn classify(
    command: MaybeCommand,
    internal_prefix: &str,
    perspective: RelaySource,
) -> Disposition {
    let command = match command {
        MaybeCommand::Valid(command) => command,
        invalid @ MaybeCommand::Invalid(_) => {
            return Disposition::PassThrough {
                command: invalid,
                reason: PassReason::NotCommand,
            }
        }
    };

    if command.has_prefix(internal_prefix) {
        return Disposition::PassThrough {
            command: MaybeCommand::Valid(command),
            reason: PassReason::Internal,
        };
    }

    let envelope = to_envelope(command);
    if is_already_relayed(&envelope, perspective) {
        Disposition::PassThrough {
            command: MaybeCommand::Valid(envelope.into_command()),
            reason: PassReason::AlreadyRelayed,
        }
    } else {
        Disposition::Relay(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shared_types::RELAY_META_KEY;

    fn forwarded_by(source: RelaySource) -> Command {
        to_envelope(Command::new("increment"))
            .mark_forwarded(source, 1)
            .into_command()
    }

    #[test]
    fn test_to_envelope_attaches_untagged_meta() {
        let envelope = to_envelope(Command::new("increment").with_payload(json!(1)));
        assert_eq!(envelope.relay(), RelayMeta::UNTAGGED);
        assert_eq!(envelope.payload(), &json!(1));
        assert!(envelope.command().meta_value(RELAY_META_KEY).is_some());
    }

    #[test]
    fn test_to_envelope_is_idempotent() {
        let once = to_envelope(Command::new("increment"));
        let twice = to_envelope(once.clone().into_command());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_to_envelope_keeps_existing_meta_untouched() {
        let tagged = Command::new("increment").with_meta(
            RELAY_META_KEY,
            json!({"forwarded": true, "source": "host", "originId": 3, "hops": 1}),
        );
        let envelope = to_envelope(tagged.clone());
        assert_eq!(envelope.command(), &tagged);
        assert_eq!(envelope.relay().origin_id, 3);
    }

    #[test]
    fn test_relayed_command_keeps_extra_keys() {
        let dispatched = MaybeCommand::parse(json!({
            "type": "fetch/failed",
            "payload": "boom",
            "error": true,
        }));
        let Disposition::Relay(envelope) =
            classify(dispatched, "@@", RelaySource::Subordinate)
        else {
            panic!("expected relay");
        };

        let wire = envelope.mark_forwarded(RelaySource::Subordinate, 2).into_value();
        assert_eq!(wire["error"], json!(true));

        let replayed = MaybeCommand::parse(wire).into_command().unwrap();
        assert_eq!(replayed.extra_value("error"), Some(&json!(true)));
        assert_eq!(replayed.payload, json!("boom"));
    }

    #[test]
    fn test_already_relayed_by_forwarded_flag() {
        let envelope = to_envelope(forwarded_by(RelaySource::Host));
        assert!(is_already_relayed(&envelope, RelaySource::Subordinate));
        assert!(is_already_relayed(&envelope, RelaySource::Host));
    }

    #[test]
    fn test_already_relayed_by_own_source() {
        let own_echo = Envelope::from_parts(
            Command::new("increment"),
            RelayMeta {
                forwarded: false,
                source: RelaySource::Subordinate,
                origin_id: 2,
            },
        );
        assert!(is_already_relayed(&own_echo, RelaySource::Subordinate));
        assert!(!is_already_relayed(&own_echo, RelaySource::Host));
    }

    #[test]
    fn test_classify_not_command() {
        let value = json!({"payload": 1});
        assert_eq!(
            classify(MaybeCommand::parse(value.clone()), "@@", RelaySource::Host),
            Disposition::PassThrough {
                command: MaybeCommand::Invalid(value),
                reason: PassReason::NotCommand,
            }
        );
    }

    #[test]
    fn test_classify_internal_prefix_is_untouched() {
        let command = Command::new("@@store/INIT");
        assert_eq!(
            classify(command.clone().into(), "@@", RelaySource::Subordinate),
            Disposition::PassThrough {
                command: MaybeCommand::Valid(command),
                reason: PassReason::Internal,
            }
        );
    }

    #[test]
    fn test_classify_internal_wins_over_untagged_meta() {
        let forwarded = to_envelope(Command::new("@@redux/INIT"))
            .mark_forwarded(RelaySource::Host, 0)
            .into_command();
        assert!(matches!(
            classify(forwarded.into(), "@@", RelaySource::Host),
            Disposition::PassThrough {
                reason: PassReason::Internal,
                ..
            }
        ));
    }

    #[test]
    fn test_classify_relays_fresh_command() {
        match classify(Command::new("increment").into(), "@@", RelaySource::Host) {
            Disposition::Relay(envelope) => assert_eq!(envelope.relay(), RelayMeta::UNTAGGED),
            other => panic!("expected relay, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_forwarded_passes_through_tagged() {
        let forwarded = forwarded_by(RelaySource::Subordinate);
        assert_eq!(
            classify(forwarded.clone().into(), "@@", RelaySource::Host),
            Disposition::PassThrough {
                command: MaybeCommand::Valid(forwarded),
                reason: PassReason::AlreadyRelayed,
            }
        );
    }
}
