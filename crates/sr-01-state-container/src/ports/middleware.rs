//! # Middleware
//!
//! A middleware sits in the dispatch pipeline between the caller and the
//! reducer. It may inspect the value, transform it, stop it, or hand it on
//! with `next`.

use crate::domain::store::StoreHandle;
use shared_types::MaybeCommand;

/// The remainder of the pipeline after the current middleware.
pub type Next<'a> = &'a dyn Fn(MaybeCommand) -> MaybeCommand;

/// A dispatch pipeline stage.
pub trait Middleware<S>: Send + Sync {
    /// Called once while the store is being built, before the initial
    /// housekeeping command is dispatched.
    fn attach(&self, _store: &StoreHandle<S>) {}

    /// Process one dispatched value.
    ///
    /// The return value is what `dispatch` returns to its caller.
    fn handle(&self, command: MaybeCommand, next: Next<'_>) -> MaybeCommand;
}
