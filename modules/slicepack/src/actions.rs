//! Action constructors that carry their derived type string.

use std::collections::BTreeMap;

use serde_json::Value;
use slicepack_common::{Action, Result, SlicePackError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionCreator {
    action_type: String,
}

impl ActionCreator {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
        }
    }

    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    pub fn create(&self, payload: impl Into<Value>) -> Action {
        Action::new(self.action_type.clone(), payload.into())
    }

    /// Payload-less variant, for `reset` and argument-free `run`.
    pub fn empty(&self) -> Action {
        Action::of_type(self.action_type.clone())
    }
}

/// Artifact key (`run`, `set`, ...) → constructor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionCreators {
    creators: BTreeMap<String, ActionCreator>,
}

impl ActionCreators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, action_type: impl Into<String>) -> Self {
        self.creators
            .insert(key.into(), ActionCreator::new(action_type));
        self
    }

    pub fn get(&self, key: &str) -> Option<&ActionCreator> {
        self.creators.get(key)
    }

    pub fn create(&self, key: &str, payload: impl Into<Value>) -> Result<Action> {
        self.get(key)
            .map(|creator| creator.create(payload))
            .ok_or_else(|| SlicePackError::UnknownAction(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    pub fn run(&self, payload: impl Into<Value>) -> Result<Action> {
        self.create("run", payload)
    }

    pub fn success(&self, payload: impl Into<Value>) -> Result<Action> {
        self.create("success", payload)
    }

    /// The payload of a fail action is the error message.
    pub fn fail(&self, message: impl Into<String>) -> Result<Action> {
        self.create("fail", Value::String(message.into()))
    }

    pub fn set(&self, payload: impl Into<Value>) -> Result<Action> {
        self.create("set", payload)
    }

    pub fn reset(&self) -> Result<Action> {
        self.create("reset", Value::Null)
    }
}
