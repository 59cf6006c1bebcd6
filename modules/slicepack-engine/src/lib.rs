//! Action store primitives.
//!
//! Provides a single-state store (reduce → swap → notify), a reference-keyed
//! memo for derived values, and an in-memory action recorder.
//!
//! Consumers define their domain by implementing `Reducer` (pure state
//! transitions that return the same `Arc` when nothing changed).

pub mod log;
pub mod memo;
pub mod store;
pub mod traits;

pub use log::{ActionLog, LoggedAction};
pub use memo::Memo;
pub use store::{Store, INIT_ACTION, REPLACE_ACTION};
pub use traits::{ActionSink, Reducer};
