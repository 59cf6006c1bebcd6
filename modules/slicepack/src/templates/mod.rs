//! Built-in generator sets.
//!
//! A slice's state lives in its bucket as a handful of named slots
//! (`user:isLoading`, `user:result`, ...). Payload-map leaves are stored
//! inside the main slot at their structural paths.

pub mod request;
pub mod simple;

use serde_json::{Map, Value};
use slicepack_common::value::{assign, is_nullish, lookup};
use slicepack_common::{Result, SlicePackError};

use crate::names::{leaf_names, nested_key_name, NameNode, NameTree};
use crate::path::{resolve, LeafDescriptor};
use crate::selectors::{Selector, SelectorNode, SelectorTree};
use crate::spec::SliceSpec;

/// Resolve the spec's payload map and reject top-level entries that would
/// shadow one of the template's own slots.
pub(crate) fn resolve_leaves(spec: &SliceSpec, reserved: &[&str]) -> Result<Vec<LeafDescriptor>> {
    let leaves = resolve(spec.payload_map.as_ref(), &spec.name)?;
    for leaf in leaves.iter().filter(|leaf| leaf.path.len() == 1) {
        let shadowed = [&leaf.path[0], &leaf.name_path[0]]
            .into_iter()
            .find(|key| reserved.contains(&key.as_str()));
        if let Some(key) = shadowed {
            return Err(SlicePackError::CollidingLeaf {
                slice: spec.name.clone(),
                name: key.clone(),
            });
        }
    }
    Ok(leaves)
}

/// Initial value of the main slot: the seed, overlaid with leaf initials
/// when there is a payload map. Leaves need an object (or absent) seed.
pub(crate) fn slot_initial(spec: &SliceSpec, leaves: &[LeafDescriptor]) -> Result<Value> {
    let seed = spec.seed().cloned();
    if leaves.is_empty() {
        return Ok(seed.unwrap_or(Value::Null));
    }

    let mut slot = match seed {
        Some(object @ Value::Object(_)) => object,
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(other) => {
            return Err(SlicePackError::config(format!(
                "slice `{}` has a payload map but its initial value is not an object: {other}",
                spec.name
            )))
        }
    };
    for leaf in leaves.iter().filter(|leaf| leaf.terminal) {
        assign(&mut slot, &leaf.path, leaf.initial.clone());
    }
    Ok(slot)
}

/// Apply leaf rules from `payload` onto `prev`.
///
/// With `only_present`, leaves whose path is absent from the payload are
/// left alone; otherwise an absent leaf reads as null.
pub(crate) fn merge_leaves(
    prev: &Value,
    payload: &Value,
    leaves: &[LeafDescriptor],
    only_present: bool,
) -> Value {
    let mut next = match prev {
        Value::Object(_) => prev.clone(),
        _ => Value::Object(Map::new()),
    };

    for leaf in leaves.iter().filter(|leaf| leaf.terminal) {
        let raw = lookup(payload, &leaf.path);
        if only_present && raw.is_none() {
            continue;
        }
        let raw = raw.cloned().unwrap_or(Value::Null);

        let mut value = match &leaf.modify_value {
            Some(modify) => {
                let previous = lookup(prev, &leaf.path).cloned().unwrap_or(Value::Null);
                modify(&raw, &previous)
            }
            None => raw,
        };
        if is_nullish(Some(&value)) {
            if let Some(fallback) = &leaf.fallback {
                value = fallback.clone();
            }
        }
        assign(&mut next, &leaf.path, value);
    }
    next
}

/// `base` plus one name per payload-map node.
pub(crate) fn state_names(
    spec: &SliceSpec,
    leaves: &[LeafDescriptor],
    base: impl IntoIterator<Item = (&'static str, String)>,
) -> NameTree {
    let mut tree = leaf_names(&spec.name, leaves);
    for (key, name) in base {
        tree.insert(key, NameNode::Name(name));
    }
    tree
}

/// Selectors for every payload-map node, reading inside `slot`.
pub(crate) fn leaf_selectors(
    spec: &SliceSpec,
    slot: &str,
    leaves: &[LeafDescriptor],
    tree: &mut SelectorTree,
) {
    for leaf in leaves {
        let selector = Selector::new(
            nested_key_name(&spec.name, &leaf.name_path),
            &spec.reducer_name,
            slot,
            leaf.path.clone(),
            leaf.format_selector.clone(),
        );
        let node = if leaf.terminal {
            SelectorNode::Leaf(selector)
        } else {
            SelectorNode::Nested {
                selector,
                children: SelectorTree::new(),
            }
        };
        tree.insert_at(&leaf.path, node);
    }
}

/// A selector for a whole slot.
pub(crate) fn slot_selector(spec: &SliceSpec, slot: String) -> Selector {
    Selector::new(slot.clone(), &spec.reducer_name, slot, Vec::new(), None)
}
