//! ActionSink implementations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use slicepack_common::Action;

use crate::traits::ActionSink;

/// One recorded dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedAction {
    pub seq: u64,
    pub action: Action,
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// ActionLog (tests, replay tooling)
// ---------------------------------------------------------------------------

/// In-memory action recorder with incrementing sequence numbers. Thread-safe.
pub struct ActionLog {
    next_seq: AtomicU64,
    entries: Mutex<Vec<LoggedAction>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Read all recorded actions (for assertions and replay output).
    pub fn entries(&self) -> Vec<LoggedAction> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Recorded action types, in dispatch order.
    pub fn action_types(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .map(|e| e.action.action_type)
            .collect()
    }
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionSink for ActionLog {
    fn record(&self, action: &Action, changed: bool) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(LoggedAction {
                seq,
                action: action.clone(),
                changed,
            });
    }
}
