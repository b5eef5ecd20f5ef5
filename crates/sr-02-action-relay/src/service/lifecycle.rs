//! # Lifecycle / Disposal
//!
//! Every listener or handler a relay registers is paired with a teardown
//! closure kept here. [`Disposer::dispose`] runs them all once; later calls
//! do nothing.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

type Teardown = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct Disposer {
    disposed: AtomicBool,
    teardowns: Mutex<Vec<Teardown>>,
}

impl Disposer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a teardown. Runs immediately if already disposed.
    pub fn defer(&self, teardown: impl FnOnce() + Send + 'static) {
        {
            let mut teardowns = self.teardowns.lock();
            if !self.disposed.load(Ordering::SeqCst) {
                teardowns.push(Box::new(teardown));
                return;
            }
        }
        teardown();
    }

    /// Run every pending teardown. Returns how many ran.
    pub fn dispose(&self) -> usize {
        let teardowns = {
            let mut teardowns = self.teardowns.lock();
            self.disposed.store(true, Ordering::SeqCst);
            std::mem::take(&mut *teardowns)
        };
        let count = teardowns.len();
        for teardown in teardowns {
            teardown();
        }
        if count > 0 {
            debug!(count, "Relay registrations disposed");
        }
        count
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.teardowns.lock().len()
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .field("pending", &self.pending())
            .finish()
    }
}
