//! Domain Layer

pub mod errors;
pub mod store;

pub use errors::StoreError;
pub use store::{Store, StoreBuilder, StoreHandle, SubscriptionId};
