//! The asynchronous request template: `run` → `success` | `fail`.
//!
//! Slots: `{name}:isLoading`, `{name}:result`, `{name}:error`.

use std::sync::Arc;

use serde_json::{Map, Value};
use slicepack_common::{Action, Result};

use crate::actions::ActionCreators;
use crate::generator::{
    Generator, ACTIONS, ACTION_NAMES, INITIAL_STATE, REDUCER, SELECTORS, STATE_NAMES,
};
use crate::names::{
    error_name, fail_name, loading_name, result_name, run_name, success_name, NameTree,
};
use crate::reducer::{bucket_object, ActionMap};
use crate::selectors::{SelectorNode, SelectorTree};
use crate::spec::SliceSpec;

use super::{leaf_selectors, merge_leaves, resolve_leaves, slot_initial, slot_selector, state_names};

const RESERVED: &[&str] = &["isLoading", "result", "error"];

pub fn generator() -> Generator {
    Generator::new()
        .with(STATE_NAMES, |spec: &SliceSpec| {
            let leaves = resolve_leaves(spec, RESERVED)?;
            Ok(state_names(
                spec,
                &leaves,
                [
                    ("isLoading", loading_name(&spec.name)),
                    ("result", result_name(&spec.name)),
                    ("error", error_name(&spec.name)),
                ],
            ))
        })
        .with(ACTION_NAMES, |spec: &SliceSpec| Ok(action_names(&spec.name)))
        .with(ACTIONS, |spec: &SliceSpec| {
            Ok(ActionCreators::new()
                .with("run", run_name(&spec.name))
                .with("success", success_name(&spec.name))
                .with("fail", fail_name(&spec.name)))
        })
        .with(INITIAL_STATE, |spec: &SliceSpec| {
            let leaves = resolve_leaves(spec, RESERVED)?;
            Ok(initial_state(spec, slot_initial(spec, &leaves)?))
        })
        .with(REDUCER, reducer)
        .with(SELECTORS, |spec: &SliceSpec| {
            let leaves = resolve_leaves(spec, RESERVED)?;
            let mut tree = SelectorTree::new();
            leaf_selectors(spec, &result_name(&spec.name), &leaves, &mut tree);
            for (key, slot) in [
                ("isLoading", loading_name(&spec.name)),
                ("result", result_name(&spec.name)),
                ("error", error_name(&spec.name)),
            ] {
                tree.insert(key, SelectorNode::Leaf(slot_selector(spec, slot)));
            }
            Ok(tree)
        })
}

fn action_names(name: &str) -> NameTree {
    NameTree::new()
        .with("run", run_name(name))
        .with("success", success_name(name))
        .with("fail", fail_name(name))
}

/// The idle state: not loading, no error, result at its initial value.
fn initial_state(spec: &SliceSpec, result: Value) -> Value {
    let mut bucket = Map::new();
    bucket.insert(loading_name(&spec.name), Value::Bool(false));
    bucket.insert(result_name(&spec.name), result);
    bucket.insert(error_name(&spec.name), Value::Null);
    Value::Object(bucket)
}

fn reducer(spec: &SliceSpec) -> Result<ActionMap> {
    let leaves = Arc::new(resolve_leaves(spec, RESERVED)?);
    let spec = Arc::new(spec.clone());
    let loading = loading_name(&spec.name);
    let result = result_name(&spec.name);
    let error = error_name(&spec.name);

    let on_run = {
        let (spec, leaves) = (Arc::clone(&spec), Arc::clone(&leaves));
        let (loading, result, error) = (loading.clone(), result.clone(), error.clone());
        move |state: &Value, action: &Action| -> Result<Value> {
            let mut bucket = bucket_object(state, action)?;
            bucket.insert(loading.clone(), Value::Bool(true));
            bucket.insert(error.clone(), Value::Null);
            if !leaves.is_empty() {
                let payload = spec.format_inbound(&action.payload);
                let prev = bucket.get(&result).cloned().unwrap_or(Value::Null);
                bucket.insert(result.clone(), merge_leaves(&prev, &payload, &leaves, true));
            }
            Ok(Value::Object(bucket))
        }
    };

    let on_success = {
        let (spec, leaves) = (Arc::clone(&spec), Arc::clone(&leaves));
        let (loading, result, error) = (loading.clone(), result.clone(), error.clone());
        move |state: &Value, action: &Action| -> Result<Value> {
            let mut bucket = bucket_object(state, action)?;
            let payload = spec.format_inbound(&action.payload);
            let next = if leaves.is_empty() {
                payload
            } else {
                let prev = bucket.get(&result).cloned().unwrap_or(Value::Null);
                merge_leaves(&prev, &payload, &leaves, false)
            };
            bucket.insert(loading.clone(), Value::Bool(false));
            bucket.insert(result.clone(), next);
            bucket.insert(error.clone(), Value::Null);
            Ok(Value::Object(bucket))
        }
    };

    let on_fail = move |state: &Value, action: &Action| -> Result<Value> {
        let mut bucket = bucket_object(state, action)?;
        // Some producers put the message in the action's `error` field instead.
        let reason = match (&action.payload, action.error()) {
            (Value::Null, Some(message)) => Value::String(message.to_string()),
            (payload, _) => payload.clone(),
        };
        bucket.insert(loading.clone(), Value::Bool(false));
        bucket.insert(error.clone(), reason);
        Ok(Value::Object(bucket))
    };

    Ok(ActionMap::new()
        .on(run_name(&spec.name), on_run)
        .on(success_name(&spec.name), on_success)
        .on(fail_name(&spec.name), on_fail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Artifact;
    use crate::path::{PayloadMap, PayloadNode};
    use serde_json::json;

    fn spec() -> SliceSpec {
        SliceSpec::builder()
            .name("user")
            .reducer_name("app")
            .result_initial(json!({"id": null}))
            .build()
    }

    fn reduce(map: &ActionMap, state: &Value, action: Action) -> Value {
        let state = Arc::new(state.clone());
        map.reduce(&state, &action).unwrap().as_ref().clone()
    }

    #[test]
    fn idle_initial_state() {
        assert_eq!(
            initial_state(&spec(), json!({"id": null})),
            json!({"user:isLoading": false, "user:result": {"id": null}, "user:error": null})
        );
    }

    #[test]
    fn run_without_payload_map_leaves_result_alone() {
        let map = reducer(&spec()).unwrap();
        let idle = initial_state(&spec(), json!({"id": null}));
        let next = reduce(&map, &idle, Action::new("user/run", json!({"id": 9})));
        assert_eq!(next["user:isLoading"], json!(true));
        assert_eq!(next["user:result"], json!({"id": null}));
    }

    #[test]
    fn run_merges_present_leaves_when_mapped() {
        let spec = SliceSpec::builder()
            .name("user")
            .reducer_name("app")
            .payload_map(
                PayloadMap::new()
                    .entry("page", PayloadNode::leaf(json!(1)))
                    .entry("items", PayloadNode::leaf(json!([]))),
            )
            .build();
        let map = reducer(&spec).unwrap();
        let idle = initial_state(&spec, json!({"page": 1, "items": ["a"]}));
        let next = reduce(&map, &idle, Action::new("user/run", json!({"page": 2})));
        assert_eq!(next["user:result"], json!({"page": 2, "items": ["a"]}));
    }

    #[test]
    fn fail_keeps_result_and_stores_payload() {
        let map = reducer(&spec()).unwrap();
        let loading = json!({"user:isLoading": true, "user:result": {"id": 3}, "user:error": null});
        let next = reduce(&map, &loading, Action::new("user/fail", json!({"code": 500})));
        assert_eq!(
            next,
            json!({"user:isLoading": false, "user:result": {"id": 3}, "user:error": {"code": 500}})
        );
    }

    #[test]
    fn fail_reads_error_field_when_payload_is_empty() {
        let map = reducer(&spec()).unwrap();
        let action = Action::of_type("user/fail").with_extra("error", json!("timeout"));
        let next = reduce(&map, &json!({}), action);
        assert_eq!(next["user:error"], json!("timeout"));
    }

    #[test]
    fn fail_bypasses_format_payload() {
        let spec = SliceSpec::builder()
            .name("user")
            .reducer_name("app")
            .format_payload(Arc::new(|_: Value| json!("formatted")))
            .build();
        let map = reducer(&spec).unwrap();
        let next = reduce(&map, &json!({}), Action::new("user/fail", json!("boom")));
        assert_eq!(next["user:error"], json!("boom"));

        let next = reduce(&map, &json!({}), Action::new("user/success", json!("raw")));
        assert_eq!(next["user:result"], json!("formatted"));
    }

    #[test]
    fn generator_produces_every_builtin() {
        let artifacts = generator().apply(&spec()).unwrap();
        let keys: Vec<_> = artifacts.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![ACTION_NAMES, ACTIONS, INITIAL_STATE, REDUCER, SELECTORS, STATE_NAMES]
        );
        match &artifacts[STATE_NAMES] {
            Artifact::Names(names) => {
                assert_eq!(names.get("isLoading"), Some("user:isLoading"));
                assert_eq!(names.get("result"), Some("user:result"));
                assert_eq!(names.get("error"), Some("user:error"));
            }
            other => panic!("unexpected artifact: {other:?}"),
        }
    }
}
