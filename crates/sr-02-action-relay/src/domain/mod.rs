//! Domain layer: pure relay decisions and configuration, no I/O.

pub mod config;
pub mod hooks;
pub mod tagger;

pub use config::{RelayConfig, RelayConfigBuilder};
pub use hooks::{CommandHook, SendHooks};
pub use tagger::{classify, is_already_relayed, to_envelope, Disposition, PassReason};
