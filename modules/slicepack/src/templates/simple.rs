//! The simple value template: `set` / `reset` over one `{name}:value` slot.

use std::sync::Arc;

use serde_json::{Map, Value};
use slicepack_common::{Action, Result};

use crate::actions::ActionCreators;
use crate::generator::{
    Generator, ACTIONS, ACTION_NAMES, INITIAL_STATE, REDUCER, SELECTORS, STATE_NAMES,
};
use crate::names::{reset_name, set_name, value_name, NameTree};
use crate::reducer::{bucket_object, ActionMap};
use crate::selectors::{SelectorNode, SelectorTree};
use crate::spec::SliceSpec;

use super::{leaf_selectors, merge_leaves, resolve_leaves, slot_initial, slot_selector, state_names};

const RESERVED: &[&str] = &["value"];

pub fn generator() -> Generator {
    Generator::new()
        .with(STATE_NAMES, |spec: &SliceSpec| {
            let leaves = resolve_leaves(spec, RESERVED)?;
            Ok(state_names(spec, &leaves, [("value", value_name(&spec.name))]))
        })
        .with(ACTION_NAMES, |spec: &SliceSpec| {
            Ok(NameTree::new()
                .with("set", set_name(&spec.name))
                .with("reset", reset_name(&spec.name)))
        })
        .with(ACTIONS, |spec: &SliceSpec| {
            Ok(ActionCreators::new()
                .with("set", set_name(&spec.name))
                .with("reset", reset_name(&spec.name)))
        })
        .with(INITIAL_STATE, |spec: &SliceSpec| {
            let leaves = resolve_leaves(spec, RESERVED)?;
            let mut bucket = Map::new();
            bucket.insert(value_name(&spec.name), slot_initial(spec, &leaves)?);
            Ok(Value::Object(bucket))
        })
        .with(REDUCER, reducer)
        .with(SELECTORS, |spec: &SliceSpec| {
            let leaves = resolve_leaves(spec, RESERVED)?;
            let mut tree = SelectorTree::new();
            leaf_selectors(spec, &value_name(&spec.name), &leaves, &mut tree);
            tree.insert(
                "value",
                SelectorNode::Leaf(slot_selector(spec, value_name(&spec.name))),
            );
            Ok(tree)
        })
}

fn reducer(spec: &SliceSpec) -> Result<ActionMap> {
    let leaves = Arc::new(resolve_leaves(spec, RESERVED)?);
    let initial = slot_initial(spec, &leaves)?;
    let spec = Arc::new(spec.clone());
    let value = value_name(&spec.name);

    let on_set = {
        let value = value.clone();
        let spec = Arc::clone(&spec);
        move |state: &Value, action: &Action| -> Result<Value> {
            let mut bucket = bucket_object(state, action)?;
            let payload = spec.format_inbound(&action.payload);
            let next = if leaves.is_empty() {
                payload
            } else {
                let prev = bucket.get(&value).cloned().unwrap_or(Value::Null);
                merge_leaves(&prev, &payload, &leaves, false)
            };
            bucket.insert(value.clone(), next);
            Ok(Value::Object(bucket))
        }
    };

    let on_reset = move |state: &Value, action: &Action| -> Result<Value> {
        let mut bucket = bucket_object(state, action)?;
        bucket.insert(value.clone(), initial.clone());
        Ok(Value::Object(bucket))
    };

    Ok(ActionMap::new()
        .on(set_name(&spec.name), on_set)
        .on(reset_name(&spec.name), on_reset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{LeafRule, PayloadMap, PayloadNode};
    use serde_json::json;

    fn reduce(map: &ActionMap, state: &Value, action: Action) -> Value {
        let state = Arc::new(state.clone());
        map.reduce(&state, &action).unwrap().as_ref().clone()
    }

    #[test]
    fn set_replaces_wholesale_without_payload_map() {
        let spec = SliceSpec::builder()
            .name("theme")
            .reducer_name("ui")
            .template(crate::Template::Simple)
            .default_initial(json!("light"))
            .build();
        let map = reducer(&spec).unwrap();
        let next = reduce(&map, &json!({"theme:value": "light"}), Action::new("theme/set", json!("dark")));
        assert_eq!(next, json!({"theme:value": "dark"}));

        let reset = reduce(&map, &next, Action::of_type("theme/reset"));
        assert_eq!(reset, json!({"theme:value": "light"}));
    }

    #[test]
    fn reset_restores_seed_overlaid_with_leaf_initials() {
        let spec = SliceSpec::builder()
            .name("filters")
            .reducer_name("ui")
            .template(crate::Template::Simple)
            .default_initial(json!({"sort": "asc", "query": "seed"}))
            .payload_map(
                PayloadMap::new()
                    .entry("query", PayloadNode::leaf(json!("")))
                    .entry("limit", LeafRule::new(json!(20)).fallback(json!(20))),
            )
            .build();
        let map = reducer(&spec).unwrap();

        let set = reduce(
            &map,
            &json!({}),
            Action::new("filters/set", json!({"query": "rust", "limit": null})),
        );
        assert_eq!(set["filters:value"], json!({"query": "rust", "limit": 20}));

        let reset = reduce(&map, &set, Action::of_type("filters/reset"));
        assert_eq!(
            reset["filters:value"],
            json!({"sort": "asc", "query": "", "limit": 20})
        );
    }

    #[test]
    fn value_collision_is_rejected() {
        let spec = SliceSpec::builder()
            .name("theme")
            .reducer_name("ui")
            .template(crate::Template::Simple)
            .payload_map(PayloadMap::new().entry("value", PayloadNode::leaf(json!(0))))
            .build();
        assert!(generator().apply(&spec).is_err());
    }
}
