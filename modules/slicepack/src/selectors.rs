//! Memoized accessors over the store state.
//!
//! A selector closes over names only (bucket, slot, structural path), never
//! over a store, so it keeps working after the root reducer is rebuilt.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use slicepack_common::value::lookup;
use slicepack_engine::Memo;

use crate::reducer::StoreState;
use crate::spec::FormatSelectorFn;

#[derive(Clone)]
pub struct Selector {
    name: String,
    reducer_name: String,
    slot: String,
    path: Vec<String>,
    memo: Arc<Memo<Value, Value>>,
}

impl Selector {
    /// Read `slot` of bucket `reducer_name`, then follow `path` inside it.
    pub fn new(
        name: impl Into<String>,
        reducer_name: impl Into<String>,
        slot: impl Into<String>,
        path: Vec<String>,
        format: Option<FormatSelectorFn>,
    ) -> Self {
        let slot = slot.into();
        let memo = {
            let slot = slot.clone();
            let path = path.clone();
            Memo::new(move |bucket: &Value| {
                let raw = bucket
                    .get(&slot)
                    .and_then(|value| lookup(value, &path))
                    .cloned()
                    .unwrap_or(Value::Null);
                match &format {
                    Some(format) => format(&raw),
                    None => raw,
                }
            })
        };

        Self {
            name: name.into(),
            reducer_name: reducer_name.into(),
            slot,
            path,
            memo: Arc::new(memo),
        }
    }

    /// The state name this selector reads, e.g. `user:isLoading`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reducer_name(&self) -> &str {
        &self.reducer_name
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Missing buckets and slots read as null. Recomputes only when the
    /// bucket `Arc` changes.
    pub fn select(&self, state: &StoreState) -> Value {
        match state.bucket(&self.reducer_name) {
            Some(bucket) => self.memo.get(bucket),
            None => Value::Null,
        }
    }

    pub fn computations(&self) -> u64 {
        self.memo.computations()
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("name", &self.name)
            .field("reducer_name", &self.reducer_name)
            .field("slot", &self.slot)
            .field("path", &self.path)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum SelectorNode {
    Leaf(Selector),
    /// Interior payload node: selects the whole sub-tree, with per-child selectors.
    Nested {
        selector: Selector,
        children: SelectorTree,
    },
}

impl SelectorNode {
    pub fn selector(&self) -> &Selector {
        match self {
            SelectorNode::Leaf(selector) | SelectorNode::Nested { selector, .. } => selector,
        }
    }

    pub fn children(&self) -> Option<&SelectorTree> {
        match self {
            SelectorNode::Leaf(_) => None,
            SelectorNode::Nested { children, .. } => Some(children),
        }
    }
}

/// Structural key → selector, mirroring the state-name tree.
#[derive(Debug, Clone, Default)]
pub struct SelectorTree {
    entries: BTreeMap<String, SelectorNode>,
}

impl SelectorTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, selector: Selector) -> Self {
        self.entries.insert(key.into(), SelectorNode::Leaf(selector));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, node: SelectorNode) {
        self.entries.insert(key.into(), node);
    }

    /// Insert below existing nested parents; see `NameTree::insert_at`.
    pub fn insert_at(&mut self, path: &[String], node: SelectorNode) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut tree = self;
        for key in parents {
            match tree.entries.get_mut(key) {
                Some(SelectorNode::Nested { children, .. }) => tree = children,
                _ => return,
            }
        }
        tree.entries.insert(last.clone(), node);
    }

    pub fn get(&self, key: &str) -> Option<&Selector> {
        self.entries.get(key).map(SelectorNode::selector)
    }

    pub fn node(&self, key: &str) -> Option<&SelectorNode> {
        self.entries.get(key)
    }

    pub fn at(&self, path: &[&str]) -> Option<&Selector> {
        let (last, parents) = path.split_last()?;
        let mut tree = self;
        for key in parents {
            tree = tree.entries.get(*key)?.children()?;
        }
        tree.get(last)
    }

    /// Shorthand for `get(key)?.select(state)`.
    pub fn select(&self, key: &str, state: &StoreState) -> Option<Value> {
        self.get(key).map(|selector| selector.select(state))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
