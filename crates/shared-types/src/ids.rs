//! Endpoint identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a context attached to the channel.
///
/// The host is always `0`; subordinate endpoints are numbered from `1` in
/// connection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(pub u32);

impl EndpointId {
    /// The authoritative host context.
    pub const HOST: EndpointId = EndpointId(0);

    #[must_use]
    pub fn is_host(self) -> bool {
        self == Self::HOST
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_host() {
            write!(f, "host")
        } else {
            write!(f, "subordinate-{}", self.0)
        }
    }
}

impl From<EndpointId> for u32 {
    fn from(id: EndpointId) -> Self {
        id.0
    }
}
