//! Adapters layer: the bridge over a subordinate transport, the isolated
//! globals it is installed into, and snapshot helpers built on the bridge.

pub mod bridge;
pub mod snapshot;

pub use bridge::{install_bridge, BridgeSurface, IsolatedGlobals, INSTALL_STEP};
pub use snapshot::{fetch_initial_state, hydrate_from_host};
