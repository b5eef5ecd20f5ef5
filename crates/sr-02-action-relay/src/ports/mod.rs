//! Ports layer: the seam between the subordinate interceptor and whatever
//! carries its commands across the isolation boundary.

pub mod outbound;

pub use outbound::{CommandBridge, CommandListener};
