//! Payload maps and the path resolver.
//!
//! A payload map describes the shape of a slice's main slot as a tree.
//! Terminal nodes carry per-leaf rules (initial value, fallback, value
//! transform, selector formatter); interior nodes group children. The
//! resolver flattens the tree into `LeafDescriptor`s in pre-order, which the
//! templates use to build names, reducers, and selectors.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use slicepack_common::value::assign;
use slicepack_common::{Result, SlicePackError};

use crate::spec::{FormatSelectorFn, ModifyValueFn};

/// Fields a JSON leaf node may carry.
const LEAF_FIELDS: &[&str] = &["initial", "key", "fallback"];

/// Rules for one terminal value.
#[derive(Clone)]
pub struct LeafRule {
    pub initial: Value,
    /// Overrides the last name segment. State lookup still uses the structural key.
    pub key: Option<String>,
    /// Substituted when the resolved value is nullish.
    pub fallback: Option<Value>,
    pub modify_value: Option<ModifyValueFn>,
    pub format_selector: Option<FormatSelectorFn>,
}

impl LeafRule {
    pub fn new(initial: Value) -> Self {
        Self {
            initial,
            key: None,
            fallback: None,
            modify_value: None,
            format_selector: None,
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn fallback(mut self, fallback: Value) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// `f(payload_value, previous_value)` produces the stored value.
    pub fn modify_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.modify_value = Some(Arc::new(f));
        self
    }

    pub fn format_selector<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.format_selector = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for LeafRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafRule")
            .field("initial", &self.initial)
            .field("key", &self.key)
            .field("fallback", &self.fallback)
            .field("modify_value", &self.modify_value.is_some())
            .field("format_selector", &self.format_selector.is_some())
            .finish()
    }
}

/// One node of a payload map.
#[derive(Debug, Clone)]
pub enum PayloadNode {
    Leaf(LeafRule),
    Interior {
        key: Option<String>,
        children: BTreeMap<String, PayloadNode>,
    },
}

impl PayloadNode {
    pub fn leaf(initial: Value) -> Self {
        PayloadNode::Leaf(LeafRule::new(initial))
    }

    pub fn interior<K, I>(children: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, PayloadNode)>,
    {
        PayloadNode::Interior {
            key: None,
            children: children.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Set the name override on either kind of node.
    pub fn with_key(self, key: impl Into<String>) -> Self {
        match self {
            PayloadNode::Leaf(rule) => PayloadNode::Leaf(rule.key(key)),
            PayloadNode::Interior { children, .. } => PayloadNode::Interior {
                key: Some(key.into()),
                children,
            },
        }
    }

    fn key_override(&self) -> Option<&str> {
        match self {
            PayloadNode::Leaf(rule) => rule.key.as_deref(),
            PayloadNode::Interior { key, .. } => key.as_deref(),
        }
    }
}

impl From<LeafRule> for PayloadNode {
    fn from(rule: LeafRule) -> Self {
        PayloadNode::Leaf(rule)
    }
}

/// The root of a payload map: structural key → node.
#[derive(Debug, Clone, Default)]
pub struct PayloadMap {
    entries: BTreeMap<String, PayloadNode>,
}

impl PayloadMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, key: impl Into<String>, node: impl Into<PayloadNode>) -> Self {
        self.entries.insert(key.into(), node.into());
        self
    }

    pub fn entries(&self) -> &BTreeMap<String, PayloadNode> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a declarative (closure-free) payload map.
    ///
    /// An object node containing `initial` is a leaf and may also carry
    /// `key` and `fallback`. Any other object is interior: `key` overrides
    /// its name, every other field is a child.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(SlicePackError::malformed(&[], "payload map must be an object"));
        };

        let mut entries = BTreeMap::new();
        for (key, node) in object {
            let path = vec![key.clone()];
            entries.insert(key.clone(), parse_node(node, &path)?);
        }
        Ok(Self { entries })
    }

    /// The slot value described by the leaf initials alone.
    pub fn initial_value(&self) -> Value {
        let mut root = Value::Object(Map::new());
        fill_initials(&self.entries, &mut Vec::new(), &mut root);
        root
    }
}

fn parse_node(value: &Value, path: &[String]) -> Result<PayloadNode> {
    let Some(object) = value.as_object() else {
        return Err(SlicePackError::malformed(
            path,
            "node must be a leaf (object with `initial`) or an object of children",
        ));
    };

    let key = match object.get("key") {
        None => None,
        Some(Value::String(k)) => Some(k.clone()),
        Some(_) => return Err(SlicePackError::malformed(path, "`key` must be a string")),
    };

    if let Some(initial) = object.get("initial") {
        if let Some(unknown) = object.keys().find(|k| !LEAF_FIELDS.contains(&k.as_str())) {
            return Err(SlicePackError::malformed(
                path,
                format!("unknown leaf field `{unknown}`"),
            ));
        }
        let mut rule = LeafRule::new(initial.clone());
        rule.key = key;
        rule.fallback = object.get("fallback").cloned();
        return Ok(PayloadNode::Leaf(rule));
    }

    let mut children = BTreeMap::new();
    for (child_key, child) in object.iter().filter(|(k, _)| k.as_str() != "key") {
        let mut child_path = path.to_vec();
        child_path.push(child_key.clone());
        children.insert(child_key.clone(), parse_node(child, &child_path)?);
    }
    Ok(PayloadNode::Interior { key, children })
}

fn fill_initials(entries: &BTreeMap<String, PayloadNode>, path: &mut Vec<String>, root: &mut Value) {
    for (key, node) in entries {
        path.push(key.clone());
        match node {
            PayloadNode::Leaf(rule) => assign(root, path, rule.initial.clone()),
            PayloadNode::Interior { children, .. } => {
                assign(root, path, Value::Object(Map::new()));
                fill_initials(children, path, root);
            }
        }
        path.pop();
    }
}

/// A resolved, flattened node of the payload map.
#[derive(Clone)]
pub struct LeafDescriptor {
    /// Structural keys from the slot root to this node.
    pub path: Vec<String>,
    /// Keys with `key` overrides applied, used for naming only.
    pub name_path: Vec<String>,
    /// For interior nodes, the object composed from the children's initials.
    pub initial: Value,
    pub fallback: Option<Value>,
    pub modify_value: Option<ModifyValueFn>,
    pub format_selector: Option<FormatSelectorFn>,
    pub terminal: bool,
}

impl LeafDescriptor {
    /// The name segment this node contributes.
    pub fn key(&self) -> &str {
        self.name_path.last().map(String::as_str).unwrap_or_default()
    }
}

impl PartialEq for LeafDescriptor {
    fn eq(&self, other: &Self) -> bool {
        fn same<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
        }

        self.path == other.path
            && self.name_path == other.name_path
            && self.initial == other.initial
            && self.fallback == other.fallback
            && self.terminal == other.terminal
            && same(&self.modify_value, &other.modify_value)
            && same(&self.format_selector, &other.format_selector)
    }
}

impl fmt::Debug for LeafDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafDescriptor")
            .field("path", &self.path)
            .field("name_path", &self.name_path)
            .field("initial", &self.initial)
            .field("fallback", &self.fallback)
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

/// Flatten a payload map into pre-order descriptors.
///
/// `slice` only labels collision errors. No map means no descriptors, and
/// generation falls back to whole-value semantics. Interior nodes without
/// children and siblings sharing a derived name are configuration errors.
pub fn resolve(map: Option<&PayloadMap>, slice: &str) -> Result<Vec<LeafDescriptor>> {
    let mut out = Vec::new();
    if let Some(map) = map {
        walk(&map.entries, &[], &[], slice, &mut out)?;
    }
    Ok(out)
}

fn walk(
    entries: &BTreeMap<String, PayloadNode>,
    path: &[String],
    name_path: &[String],
    slice: &str,
    out: &mut Vec<LeafDescriptor>,
) -> Result<()> {
    let mut seen = BTreeSet::new();

    for (key, node) in entries {
        let mut node_path = path.to_vec();
        node_path.push(key.clone());
        let mut node_name_path = name_path.to_vec();
        node_name_path.push(node.key_override().unwrap_or(key).to_string());

        if !seen.insert(node_name_path[node_name_path.len() - 1].clone()) {
            return Err(SlicePackError::CollidingLeaf {
                slice: slice.to_string(),
                name: node_name_path.join("."),
            });
        }

        match node {
            PayloadNode::Leaf(rule) => out.push(LeafDescriptor {
                path: node_path,
                name_path: node_name_path,
                initial: rule.initial.clone(),
                fallback: rule.fallback.clone(),
                modify_value: rule.modify_value.clone(),
                format_selector: rule.format_selector.clone(),
                terminal: true,
            }),
            PayloadNode::Interior { children, .. } => {
                if children.is_empty() {
                    return Err(SlicePackError::malformed(
                        &node_path,
                        "interior node has no children",
                    ));
                }

                let mut initial = Value::Object(Map::new());
                fill_initials(children, &mut Vec::new(), &mut initial);
                out.push(LeafDescriptor {
                    path: node_path.clone(),
                    name_path: node_name_path.clone(),
                    initial,
                    fallback: None,
                    modify_value: None,
                    format_selector: None,
                    terminal: false,
                });
                walk(children, &node_path, &node_name_path, slice, out)?;
            }
        }
    }
    Ok(())
}
