//! Core traits for the store.

use std::sync::Arc;

use anyhow::Result;
use slicepack_common::Action;

/// Pure state transitions. No I/O, no side effects.
///
/// Returns the next state. Implementations must hand back the *same* `Arc`
/// (`Arc::ptr_eq`) when the action does not concern them, so memoized
/// readers downstream are not invalidated.
pub trait Reducer<S>: Send + Sync {
    fn reduce(&self, state: &Arc<S>, action: &Action) -> Result<Arc<S>>;
}

/// Plain functions are reducers.
impl<S, F> Reducer<S> for F
where
    F: Fn(&Arc<S>, &Action) -> Result<Arc<S>> + Send + Sync,
{
    fn reduce(&self, state: &Arc<S>, action: &Action) -> Result<Arc<S>> {
        self(state, action)
    }
}

/// Observes every action after it has been reduced.
///
/// Implemented by `ActionLog` (tests, replay tooling).
pub trait ActionSink: Send + Sync {
    fn record(&self, action: &Action, changed: bool);
}

impl<T: ActionSink + ?Sized> ActionSink for Arc<T> {
    fn record(&self, action: &Action, changed: bool) {
        (**self).record(action, changed)
    }
}
