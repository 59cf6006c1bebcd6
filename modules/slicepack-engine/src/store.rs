//! The dispatch loop.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use slicepack_common::Action;
use tracing::{debug, info};

use crate::traits::{ActionSink, Reducer};

/// Dispatched once when a store is created.
pub const INIT_ACTION: &str = "@@slicepack/INIT";

/// Dispatched after every reducer replacement so new buckets get seeded.
pub const REPLACE_ACTION: &str = "@@slicepack/REPLACE";

/// Single-state action store.
///
/// Reduce → swap state → notify sinks. The reducer runs outside the lock,
/// so reducers and sinks may freely read the store (or swap its reducer)
/// without deadlocking. Reducers must be pure: under contention an action
/// may be reduced more than once before it is committed. Cloning a `Store`
/// yields another handle to the same state.
pub struct Store<S> {
    inner: Arc<Mutex<StoreInner<S>>>,
}

struct StoreInner<S> {
    state: Arc<S>,
    reducer: Arc<dyn Reducer<S>>,
    sinks: Vec<Arc<dyn ActionSink>>,
    logger_on: bool,
    dispatched: u64,
    replacements: u64,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Send + Sync + 'static> Store<S> {
    /// Create a store and dispatch the init action through `reducer`.
    pub fn new(reducer: Arc<dyn Reducer<S>>, initial: S) -> Result<Self> {
        let store = Self {
            inner: Arc::new(Mutex::new(StoreInner {
                state: Arc::new(initial),
                reducer,
                sinks: Vec::new(),
                logger_on: false,
                dispatched: 0,
                replacements: 0,
            })),
        };
        store.dispatch(Action::of_type(INIT_ACTION))?;
        Ok(store)
    }

    /// Log every dispatched action at `info` level instead of `debug`.
    pub fn with_logger(self, on: bool) -> Self {
        self.set_logger(on);
        self
    }

    pub fn set_logger(&self, on: bool) {
        self.lock().logger_on = on;
    }

    pub fn with_sink(self, sink: Arc<dyn ActionSink>) -> Self {
        self.lock().sinks.push(sink);
        self
    }

    /// Dispatch an action. A reducer error leaves the state untouched and
    /// is returned to the caller.
    ///
    /// The result is committed only if neither the state nor the reducer
    /// moved while the reducer ran; otherwise the action is reduced again
    /// against the newer snapshot. Concurrent dispatches therefore never
    /// drop each other's transitions.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        let (changed, sinks, logger_on) = loop {
            let (reducer, state) = {
                let inner = self.lock();
                (Arc::clone(&inner.reducer), Arc::clone(&inner.state))
            };

            let next = reducer.reduce(&state, &action)?;

            let mut inner = self.lock();
            if !Arc::ptr_eq(&inner.state, &state) || !Arc::ptr_eq(&inner.reducer, &reducer) {
                continue;
            }
            let changed = !Arc::ptr_eq(&state, &next);
            inner.state = next;
            inner.dispatched += 1;
            break (changed, inner.sinks.clone(), inner.logger_on);
        };

        if logger_on {
            info!(action_type = %action.action_type, changed, "action dispatched");
        } else {
            debug!(action_type = %action.action_type, changed, "action dispatched");
        }

        for sink in &sinks {
            sink.record(&action, changed);
        }

        Ok(())
    }

    /// Current state snapshot.
    pub fn state(&self) -> Arc<S> {
        Arc::clone(&self.lock().state)
    }

    /// Swap the reducer, keeping accumulated state, then dispatch the
    /// replace action so the new reducer can seed what it is missing.
    pub fn replace_reducer(&self, reducer: Arc<dyn Reducer<S>>) -> Result<()> {
        {
            let mut inner = self.lock();
            inner.reducer = reducer;
            inner.replacements += 1;
        }
        self.dispatch(Action::of_type(REPLACE_ACTION))
    }

    /// Number of reducer replacements since creation.
    pub fn replacement_count(&self) -> u64 {
        self.lock().replacements
    }

    /// Number of dispatched actions, internal ones included.
    pub fn dispatch_count(&self) -> u64 {
        self.lock().dispatched
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner<S>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
