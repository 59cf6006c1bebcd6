//! The action wire shape: `{ "type": .., "payload": .., ...extra }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A dispatched action. The reducer routes on `action_type`; everything
/// besides `type` and `payload` is carried in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Action {
    pub fn new(action_type: impl Into<String>, payload: Value) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
            extra: Map::new(),
        }
    }

    /// An action with a null payload.
    pub fn of_type(action_type: impl Into<String>) -> Self {
        Self::new(action_type, Value::Null)
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// The optional `error` field some producers attach next to the payload.
    pub fn error(&self) -> Option<&str> {
        self.extra.get("error").and_then(Value::as_str)
    }
}
