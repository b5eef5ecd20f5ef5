//! # Store
//!
//! Holds a state value, applies commands to it through a reducer and
//! notifies subscribers after every reduction.
//!
//! Values without a discriminator ([`MaybeCommand::Invalid`]) travel the
//! middleware chain like anything else but never reach the reducer.

use crate::domain::errors::StoreError;
use crate::ports::middleware::Middleware;
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared_types::{Command, MaybeCommand};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Housekeeping command dispatched once when a store is built.
pub const INIT_KIND: &str = "@@store/INIT";

type Reducer<S> = Arc<dyn Fn(&S, &Command) -> S + Send + Sync>;
type Subscriber = Arc<dyn Fn() + Send + Sync>;

/// Handle for removing a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

struct StoreInner<S> {
    state: RwLock<S>,
    reducer: Reducer<S>,
    middleware: Vec<Arc<dyn Middleware<S>>>,
    subscribers: Mutex<BTreeMap<SubscriptionId, Subscriber>>,
    next_subscription: AtomicU64,
}

impl<S: Clone + Send + Sync + 'static> StoreInner<S> {
    fn dispatch_from(&self, index: usize, command: MaybeCommand) -> MaybeCommand {
        match self.middleware.get(index) {
            Some(middleware) => middleware.handle(command, &|next: MaybeCommand| {
                self.dispatch_from(index + 1, next)
            }),
            None => self.reduce(command),
        }
    }

    fn reduce(&self, command: MaybeCommand) -> MaybeCommand {
        let MaybeCommand::Valid(valid) = &command else {
            debug!("Non-command value reached the reducer stage, ignored");
            return command;
        };
        {
            let mut state = self.state.write();
            let next = (self.reducer)(&state, valid);
            *state = next;
        }
        self.notify();
        command
    }

    fn replace(&self, state: S) {
        *self.state.write() = state;
        self.notify();
    }

    fn notify(&self) {
        let subscribers: Vec<Subscriber> = self.subscribers.lock().values().cloned().collect();
        for subscriber in subscribers {
            subscriber();
        }
    }
}

/// A state container.
///
/// Cloning a `Store` yields another handle to the same container.
pub struct Store<S> {
    inner: Arc<StoreInner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Clone + Send + Sync + 'static> Store<S> {
    /// Start building a store from its initial state and reducer.
    pub fn builder<R>(initial: S, reducer: R) -> StoreBuilder<S>
    where
        R: Fn(&S, &Command) -> S + Send + Sync + 'static,
    {
        StoreBuilder {
            initial,
            reducer: Arc::new(reducer),
            middleware: Vec::new(),
        }
    }

    /// Dispatch through the full middleware chain.
    pub fn dispatch(&self, command: impl Into<MaybeCommand>) -> MaybeCommand {
        self.inner.dispatch_from(0, command.into())
    }

    /// Current state.
    #[must_use]
    pub fn get_state(&self) -> S {
        self.inner.state.read().clone()
    }

    /// Replace the whole state, bypassing reducer and middleware.
    pub fn replace_state(&self, state: S) {
        self.inner.replace(state);
    }

    /// Call `subscriber` after every reduction.
    pub fn subscribe(&self, subscriber: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.lock().insert(id, Arc::new(subscriber));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.subscribers.lock().remove(&id).is_some()
    }

    /// A weak handle to this store.
    #[must_use]
    pub fn handle(&self) -> StoreHandle<S> {
        StoreHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<S: Clone + Serialize + Send + Sync + 'static> Store<S> {
    /// Serialize the current state.
    pub fn snapshot(&self) -> Result<Value, StoreError> {
        serde_json::to_value(&*self.inner.state.read())
            .map_err(|e| StoreError::Snapshot(e.to_string()))
    }
}

impl<S: Clone + DeserializeOwned + Send + Sync + 'static> Store<S> {
    /// Replace the state with a decoded snapshot.
    pub fn hydrate(&self, snapshot: Value) -> Result<(), StoreError> {
        let state: S =
            serde_json::from_value(snapshot).map_err(|e| StoreError::Hydrate(e.to_string()))?;
        self.replace_state(state);
        Ok(())
    }
}

/// Builder for [`Store`].
pub struct StoreBuilder<S> {
    initial: S,
    reducer: Reducer<S>,
    middleware: Vec<Arc<dyn Middleware<S>>>,
}

impl<S: Clone + Send + Sync + 'static> StoreBuilder<S> {
    /// Append a middleware. The first one added sees commands first.
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware<S>>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Build the store.
    ///
    /// Every middleware is attached first; then [`INIT_KIND`] is dispatched
    /// through the whole chain.
    pub fn build(self) -> Store<S> {
        let store = Store {
            inner: Arc::new(StoreInner {
                state: RwLock::new(self.initial),
                reducer: self.reducer,
                middleware: self.middleware,
                subscribers: Mutex::new(BTreeMap::new()),
                next_subscription: AtomicU64::new(1),
            }),
        };

        let handle = store.handle();
        for middleware in &store.inner.middleware {
            middleware.attach(&handle);
        }
        store.dispatch(Command::new(INIT_KIND));
        store
    }
}

/// Weak handle to a store.
///
/// Held by middleware and channel listeners so that they never keep a store
/// alive on their own.
pub struct StoreHandle<S> {
    inner: Weak<StoreInner<S>>,
}

impl<S> Clone for StoreHandle<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: Clone + Send + Sync + 'static> StoreHandle<S> {
    /// Dispatch through the full middleware chain.
    pub fn dispatch(&self, command: impl Into<MaybeCommand>) -> Result<MaybeCommand, StoreError> {
        let inner = self.inner.upgrade().ok_or(StoreError::Dropped)?;
        Ok(inner.dispatch_from(0, command.into()))
    }

    pub fn get_state(&self) -> Result<S, StoreError> {
        let inner = self.inner.upgrade().ok_or(StoreError::Dropped)?;
        let state = inner.state.read().clone();
        Ok(state)
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl<S: Clone + Serialize + Send + Sync + 'static> StoreHandle<S> {
    /// Serialize the current state, computed fresh on every call.
    pub fn snapshot(&self) -> Result<Value, StoreError> {
        let inner = self.inner.upgrade().ok_or(StoreError::Dropped)?;
        // Bound so the read guard drops before `inner`, which it borrows.
        let snapshot = serde_json::to_value(&*inner.state.read())
            .map_err(|e| StoreError::Snapshot(e.to_string()));
        snapshot
    }
}
