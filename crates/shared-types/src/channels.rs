//! # Well-Known Channel Names
//!
//! Fixed for the lifetime of the library. Both directions of command relay use
//! distinct names so that a context listening on one can never receive its
//! own outbound traffic.

/// Host → subordinate command relay.
pub const CHANNEL_TO_SUBORDINATE: &str = "state-relay:to-subordinate";

/// Subordinate → host command relay.
pub const CHANNEL_TO_HOST: &str = "state-relay:to-host";

/// Invoke-style (non-blocking) snapshot request.
pub const CHANNEL_SNAPSHOT_ASYNC: &str = "state-relay:snapshot-async";

/// Blocking snapshot request.
pub const CHANNEL_SNAPSHOT_SYNC: &str = "state-relay:snapshot-sync";

/// Reserved key under which the bridge surface is exposed inside an
/// isolated subordinate context.
pub const BRIDGE_GLOBAL_KEY: &str = "__stateRelayBridge";

/// Prefix reserved for the state container's own housekeeping commands.
pub const INTERNAL_KIND_PREFIX: &str = "@@";
