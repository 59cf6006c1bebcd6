//! Named generator blocks and their composition.
//!
//! A `Generator` is an ordered list of `(artifact key, block)` entries.
//! Applying it runs every block against the same `SliceSpec`, left to
//! right, and later entries overwrite earlier ones by key. The built-in
//! templates are generators, and so are extensions passed to
//! `Pack::with_generator`.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use slicepack_common::{Result, SlicePackError};

use crate::actions::ActionCreators;
use crate::names::NameTree;
use crate::reducer::ActionMap;
use crate::selectors::SelectorTree;
use crate::spec::SliceSpec;

pub const STATE_NAMES: &str = "stateNames";
pub const ACTION_NAMES: &str = "actionNames";
pub const ACTIONS: &str = "actions";
pub const INITIAL_STATE: &str = "initialState";
pub const REDUCER: &str = "reducer";
pub const SELECTORS: &str = "selectors";

/// Keys a generator may not produce.
const RESERVED: &[&str] = &["name"];

/// One generated artifact.
#[derive(Clone)]
pub enum Artifact {
    Names(NameTree),
    Actions(ActionCreators),
    Reducer(ActionMap),
    Selectors(SelectorTree),
    Value(Value),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Artifact {
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Artifact::Custom(Arc::new(value))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Artifact::Names(_) => "names",
            Artifact::Actions(_) => "actions",
            Artifact::Reducer(_) => "reducer",
            Artifact::Selectors(_) => "selectors",
            Artifact::Value(_) => "value",
            Artifact::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Names(names) => f.debug_tuple("Names").field(names).finish(),
            Artifact::Actions(actions) => f.debug_tuple("Actions").field(actions).finish(),
            Artifact::Reducer(map) => f.debug_tuple("Reducer").field(map).finish(),
            Artifact::Selectors(tree) => f.debug_tuple("Selectors").field(tree).finish(),
            Artifact::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Artifact::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<NameTree> for Artifact {
    fn from(names: NameTree) -> Self {
        Artifact::Names(names)
    }
}

impl From<ActionCreators> for Artifact {
    fn from(actions: ActionCreators) -> Self {
        Artifact::Actions(actions)
    }
}

impl From<ActionMap> for Artifact {
    fn from(map: ActionMap) -> Self {
        Artifact::Reducer(map)
    }
}

impl From<SelectorTree> for Artifact {
    fn from(tree: SelectorTree) -> Self {
        Artifact::Selectors(tree)
    }
}

impl From<Value> for Artifact {
    fn from(value: Value) -> Self {
        Artifact::Value(value)
    }
}

/// Builds one artifact from a spec.
#[derive(Clone)]
pub struct GeneratorBlock(Arc<dyn Fn(&SliceSpec) -> Result<Artifact> + Send + Sync>);

impl GeneratorBlock {
    pub fn new<F, A>(f: F) -> Self
    where
        F: Fn(&SliceSpec) -> Result<A> + Send + Sync + 'static,
        A: Into<Artifact>,
    {
        Self(Arc::new(move |spec: &SliceSpec| -> Result<Artifact> {
            f(spec).map(Into::into)
        }))
    }

    /// A block that ignores the spec.
    pub fn constant(artifact: impl Into<Artifact>) -> Self {
        let artifact = artifact.into();
        Self(Arc::new(move |_: &SliceSpec| -> Result<Artifact> {
            Ok(artifact.clone())
        }))
    }

    pub fn generate(&self, spec: &SliceSpec) -> Result<Artifact> {
        (self.0)(spec)
    }
}

impl fmt::Debug for GeneratorBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GeneratorBlock(..)")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Generator {
    entries: Vec<(String, GeneratorBlock)>,
}

impl Generator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block built from a closure.
    pub fn with<F, A>(self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&SliceSpec) -> Result<A> + Send + Sync + 'static,
        A: Into<Artifact>,
    {
        self.block(key, GeneratorBlock::new(f))
    }

    pub fn block(mut self, key: impl Into<String>, block: GeneratorBlock) -> Self {
        self.entries.push((key.into(), block));
        self
    }

    pub fn constant(self, key: impl Into<String>, artifact: impl Into<Artifact>) -> Self {
        self.block(key, GeneratorBlock::constant(artifact))
    }

    /// `self` followed by `other`; `other` wins on shared keys.
    pub fn merged(&self, other: &Generator) -> Generator {
        Generator {
            entries: self
                .entries
                .iter()
                .chain(other.entries.iter())
                .cloned()
                .collect(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// True when some entry produces `key`.
    pub fn produces(&self, key: &str) -> bool {
        self.keys().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        match self.keys().find(|key| RESERVED.contains(key)) {
            Some(key) => Err(SlicePackError::ReservedArtifact(key.to_string())),
            None => Ok(()),
        }
    }

    pub fn apply(&self, spec: &SliceSpec) -> Result<BTreeMap<String, Artifact>> {
        self.apply_onto(BTreeMap::new(), spec)
    }

    /// Run every block over `base`. Nothing is returned unless all blocks succeed.
    pub fn apply_onto(
        &self,
        mut base: BTreeMap<String, Artifact>,
        spec: &SliceSpec,
    ) -> Result<BTreeMap<String, Artifact>> {
        self.validate()?;
        for (key, block) in &self.entries {
            base.insert(key.clone(), block.generate(spec)?);
        }
        Ok(base)
    }
}
