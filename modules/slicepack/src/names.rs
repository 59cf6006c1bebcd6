//! Canonical identifier derivation.
//!
//! Every action type and state key a slice uses comes from these pure
//! functions. Action types use `/` as separator, state keys use `:`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::path::LeafDescriptor;

pub fn run_name(name: &str) -> String {
    format!("{name}/run")
}

pub fn success_name(name: &str) -> String {
    format!("{name}/success")
}

pub fn fail_name(name: &str) -> String {
    format!("{name}/fail")
}

pub fn set_name(name: &str) -> String {
    format!("{name}/set")
}

pub fn reset_name(name: &str) -> String {
    format!("{name}/reset")
}

pub fn loading_name(name: &str) -> String {
    format!("{name}:isLoading")
}

pub fn result_name(name: &str) -> String {
    format!("{name}:result")
}

pub fn error_name(name: &str) -> String {
    format!("{name}:error")
}

pub fn value_name(name: &str) -> String {
    format!("{name}:value")
}

pub fn key_name(name: &str, key: &str) -> String {
    format!("{name}:{key}")
}

/// `key_name` folded over a name path: `[a, b]` → `key_name(key_name(name, a), b)`.
pub fn nested_key_name(name: &str, name_path: &[String]) -> String {
    name_path
        .iter()
        .fold(name.to_string(), |acc, key| key_name(&acc, key))
}

/// A generated name, or a name with nested children (interior payload nodes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NameNode {
    Name(String),
    Nested { name: String, children: NameTree },
}

impl NameNode {
    pub fn name(&self) -> &str {
        match self {
            NameNode::Name(name) | NameNode::Nested { name, .. } => name,
        }
    }

    pub fn children(&self) -> Option<&NameTree> {
        match self {
            NameNode::Name(_) => None,
            NameNode::Nested { children, .. } => Some(children),
        }
    }
}

/// Structural key → generated name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NameTree {
    entries: BTreeMap<String, NameNode>,
}

impl NameTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.entries.insert(key.into(), NameNode::Name(name.into()));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, node: NameNode) {
        self.entries.insert(key.into(), node);
    }

    /// Insert `node` below already-present nested parents. Missing or
    /// non-nested parents are ignored.
    pub fn insert_at(&mut self, path: &[String], node: NameNode) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut tree = self;
        for key in parents {
            match tree.entries.get_mut(key) {
                Some(NameNode::Nested { children, .. }) => tree = children,
                _ => return,
            }
        }
        tree.entries.insert(last.clone(), node);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(NameNode::name)
    }

    pub fn node(&self, key: &str) -> Option<&NameNode> {
        self.entries.get(key)
    }

    /// Follow structural keys through nested nodes.
    pub fn at(&self, path: &[&str]) -> Option<&str> {
        let (last, parents) = path.split_last()?;
        let mut tree = self;
        for key in parents {
            tree = tree.entries.get(*key)?.children()?;
        }
        tree.get(last)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NameNode)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

/// Name tree for pre-order payload descriptors, keyed structurally.
pub fn leaf_names(slice: &str, leaves: &[LeafDescriptor]) -> NameTree {
    let mut tree = NameTree::new();
    for leaf in leaves {
        let name = nested_key_name(slice, &leaf.name_path);
        let node = if leaf.terminal {
            NameNode::Name(name)
        } else {
            NameNode::Nested {
                name,
                children: NameTree::new(),
            }
        };
        tree.insert_at(&leaf.path, node);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{resolve, LeafRule, PayloadMap, PayloadNode};
    use serde_json::json;

    #[test]
    fn action_and_state_names_are_fixed_concatenations() {
        assert_eq!(run_name("user"), "user/run");
        assert_eq!(success_name("user"), "user/success");
        assert_eq!(fail_name("user"), "user/fail");
        assert_eq!(set_name("theme"), "theme/set");
        assert_eq!(reset_name("theme"), "theme/reset");
        assert_eq!(loading_name("user"), "user:isLoading");
        assert_eq!(result_name("user"), "user:result");
        assert_eq!(error_name("user"), "user:error");
        assert_eq!(value_name("theme"), "theme:value");
        assert_eq!(key_name("user", "id"), "user:id");
    }

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(run_name("a"), run_name("a"));
        assert_ne!(run_name("a"), run_name("b"));
        assert_ne!(result_name("a"), result_name("b"));
    }

    #[test]
    fn nested_key_name_folds_segments() {
        let path = vec!["profile".to_string(), "name".to_string()];
        assert_eq!(nested_key_name("user", &path), "user:profile:name");
        assert_eq!(nested_key_name("user", &[]), "user");
    }

    #[test]
    fn leaf_names_mirror_payload_structure() {
        let map = PayloadMap::new()
            .entry("id", PayloadNode::leaf(json!(0)))
            .entry(
                "profile",
                PayloadNode::interior([(
                    "name",
                    PayloadNode::from(LeafRule::new(json!("")).key("displayName")),
                )]),
            );
        let leaves = resolve(Some(&map), "user").unwrap();
        let names = leaf_names("user", &leaves);

        assert_eq!(names.get("id"), Some("user:id"));
        assert_eq!(names.get("profile"), Some("user:profile"));
        assert_eq!(
            names.at(&["profile", "name"]),
            Some("user:profile:displayName")
        );
        assert_eq!(names.at(&["profile", "missing"]), None);
    }

    #[test]
    fn name_tree_serializes_as_plain_strings_and_nested_objects() {
        let mut tree = NameTree::new().with("run", "user/run");
        tree.insert(
            "profile",
            NameNode::Nested {
                name: "user:profile".to_string(),
                children: NameTree::new().with("name", "user:profile:name"),
            },
        );
        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({
                "profile": {"name": "user:profile", "children": {"name": "user:profile:name"}},
                "run": "user/run"
            })
        );
    }
}
