//! Typed snapshot helpers for subordinate startup.
//!
//! A subordinate store starts from the host's state rather than from its
//! reducer's default, either by blocking before the store is built
//! ([`fetch_initial_state`]) or by replacing the state of an existing store
//! once the host answers ([`hydrate_from_host`]).

use crate::error::RelayError;
use crate::ports::outbound::CommandBridge;
use serde::de::DeserializeOwned;
use sr_01_state_container::{Store, StoreError};
use tracing::debug;

/// Fetch and decode the host's state, blocking until the host replies.
///
/// Inherits the hazard of [`CommandBridge::request_snapshot_sync`]: no
/// timeout, and it must not run on the thread that pumps the host.
pub fn fetch_initial_state<S: DeserializeOwned>(bridge: &dyn CommandBridge) -> Result<S, RelayError> {
    let snapshot = bridge.request_snapshot_sync()?;
    debug!(endpoint = %bridge.endpoint_id(), "Initial state fetched");
    serde_json::from_value(snapshot).map_err(|e| StoreError::Hydrate(e.to_string()).into())
}

/// Replace `store`'s state with the host's current state.
///
/// Bypasses the middleware chain, so nothing is relayed.
pub async fn hydrate_from_host<S>(store: &Store<S>, bridge: &dyn CommandBridge) -> Result<(), RelayError>
where
    S: Clone + DeserializeOwned + Send + Sync + 'static,
{
    let snapshot = bridge.request_snapshot().await?;
    store.hydrate(snapshot)?;
    debug!(endpoint = %bridge.endpoint_id(), "Store hydrated from host");
    Ok(())
}
