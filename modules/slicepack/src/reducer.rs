//! Bucket action maps and the composed root reducer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use slicepack_common::value::{fill_missing, has_missing};
use slicepack_common::{Action, Result, SlicePackError};
use slicepack_engine::Reducer;

/// Computes a bucket's next state for one action type.
pub type Handler = Arc<dyn Fn(&Value, &Action) -> Result<Value> + Send + Sync>;

/// Action type → handler for one bucket (or one slice's share of it).
#[derive(Clone, Default)]
pub struct ActionMap {
    handlers: BTreeMap<String, Handler>,
}

impl ActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `insert` for closures.
    pub fn on<F>(mut self, action_type: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &Action) -> Result<Value> + Send + Sync + 'static,
    {
        self.handlers.insert(action_type.into(), Arc::new(f));
        self
    }

    pub fn insert(&mut self, action_type: impl Into<String>, handler: Handler) {
        self.handlers.insert(action_type.into(), handler);
    }

    pub fn get(&self, action_type: &str) -> Option<&Handler> {
        self.handlers.get(action_type)
    }

    pub fn handles(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    pub fn action_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Merge `other` in, overwriting same-type handlers. Returns the
    /// overwritten action types.
    pub fn merge(&mut self, other: &ActionMap) -> Vec<String> {
        let mut replaced = Vec::new();
        for (action_type, handler) in &other.handlers {
            if self
                .handlers
                .insert(action_type.clone(), Arc::clone(handler))
                .is_some()
            {
                replaced.push(action_type.clone());
            }
        }
        replaced
    }

    /// Apply the matching handler. Unknown types return the same `Arc`.
    pub fn reduce(&self, state: &Arc<Value>, action: &Action) -> Result<Arc<Value>> {
        match self.handlers.get(&action.action_type) {
            Some(handler) => Ok(Arc::new(handler(state, action)?)),
            None => Ok(Arc::clone(state)),
        }
    }
}

impl fmt::Debug for ActionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// Copy the bucket's object so a handler can rewrite its own slots.
pub fn bucket_object(state: &Value, action: &Action) -> Result<Map<String, Value>> {
    match state {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        other => Err(SlicePackError::reducer(
            &action.action_type,
            format!("bucket state must be an object, found {}", json_kind(other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Whole-store state: bucket name → bucket value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    buckets: BTreeMap<String, Arc<Value>>,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(mut self, name: impl Into<String>, value: Value) -> Self {
        self.buckets.insert(name.into(), Arc::new(value));
        self
    }

    pub fn bucket(&self, name: &str) -> Option<&Arc<Value>> {
        self.buckets.get(name)
    }

    /// One slot of one bucket.
    pub fn get(&self, bucket: &str, key: &str) -> Option<&Value> {
        self.buckets.get(bucket)?.get(key)
    }

    pub fn bucket_names(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.buckets
                .iter()
                .map(|(k, v)| (k.clone(), (**v).clone()))
                .collect(),
        )
    }
}

/// The structural combination of every registered bucket.
///
/// On each action, a bucket missing from the state (or missing some of its
/// seed keys) is seeded first, then the bucket's action map runs. Buckets
/// present in the state but unknown to this reducer are carried over.
#[derive(Debug, Clone, Default)]
pub struct RootReducer {
    buckets: BTreeMap<String, ActionMap>,
    seeds: BTreeMap<String, Value>,
}

impl RootReducer {
    pub fn new(buckets: BTreeMap<String, ActionMap>, seeds: BTreeMap<String, Value>) -> Self {
        Self { buckets, seeds }
    }

    pub fn bucket_names(&self) -> BTreeSet<&str> {
        self.buckets
            .keys()
            .chain(self.seeds.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn handles(&self, action_type: &str) -> bool {
        self.buckets.values().any(|map| map.handles(action_type))
    }

    pub fn action_map(&self, bucket: &str) -> Option<&ActionMap> {
        self.buckets.get(bucket)
    }

    pub fn seed(&self, bucket: &str) -> Option<&Value> {
        self.seeds.get(bucket)
    }

    fn seeded(&self, name: &str, current: Option<&Arc<Value>>) -> Arc<Value> {
        let seed = self.seeds.get(name);
        match (current, seed) {
            (None, Some(seed)) => Arc::new(seed.clone()),
            (None, None) => Arc::new(Value::Object(Map::new())),
            (Some(current), Some(seed)) if has_missing(current, seed) => {
                let mut filled = (**current).clone();
                fill_missing(&mut filled, seed);
                Arc::new(filled)
            }
            (Some(current), _) => Arc::clone(current),
        }
    }
}

impl Reducer<StoreState> for RootReducer {
    fn reduce(&self, state: &Arc<StoreState>, action: &Action) -> anyhow::Result<Arc<StoreState>> {
        let mut next: Option<StoreState> = None;

        for name in self.bucket_names() {
            let current = state.buckets.get(name);
            let seeded = self.seeded(name, current);
            let reduced = match self.buckets.get(name) {
                Some(map) => map.reduce(&seeded, action)?,
                None => seeded,
            };

            let unchanged = current.is_some_and(|c| Arc::ptr_eq(c, &reduced));
            if !unchanged {
                next.get_or_insert_with(|| (**state).clone())
                    .buckets
                    .insert(name.to_string(), reduced);
            }
        }

        Ok(next.map(Arc::new).unwrap_or_else(|| Arc::clone(state)))
    }
}
