//! Structural-path helpers over `serde_json::Value` trees.

use serde_json::{Map, Value};

/// Null and missing values are both nullish.
pub fn is_nullish(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// Follow `path` through nested objects. An empty path returns the root.
pub fn lookup<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| node.as_object()?.get(key))
}

/// Write `value` at `path`, creating (or replacing non-object) intermediates.
pub fn assign(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for key in parents {
        node = ensure_object(node)
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.clone(), value);
}

/// Insert every key of `seed` missing from `target`. Returns whether anything changed.
pub fn fill_missing(target: &mut Value, seed: &Value) -> bool {
    let (Some(target), Some(seed)) = (target.as_object_mut(), seed.as_object()) else {
        return false;
    };

    let mut changed = false;
    for (key, value) in seed {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// True when `seed` is an object whose keys are not all present in `target`.
pub fn has_missing(target: &Value, seed: &Value) -> bool {
    match (target.as_object(), seed.as_object()) {
        (Some(target), Some(seed)) => seed.keys().any(|k| !target.contains_key(k)),
        _ => false,
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
