//! The generated artifact bundle for one slice.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use slicepack_common::{Action, Result, SlicePackError};
use tracing::debug;

use crate::actions::ActionCreators;
use crate::generator::{
    Artifact, Generator, ACTIONS, ACTION_NAMES, INITIAL_STATE, REDUCER, SELECTORS, STATE_NAMES,
};
use crate::names::NameTree;
use crate::reducer::ActionMap;
use crate::registry::Registry;
use crate::selectors::SelectorTree;
use crate::spec::SliceSpec;

/// Names, actions, initial state, reducer, and selectors for one slice,
/// plus whatever extension blocks added.
///
/// Built-in artifacts are looked up through typed accessors that return
/// `None` if an extension replaced them with a different kind.
#[derive(Clone, Debug)]
pub struct Pack {
    name: String,
    spec: Arc<SliceSpec>,
    generator: Generator,
    artifacts: BTreeMap<String, Artifact>,
    registry: Registry,
}

impl Pack {
    /// Generate every artifact, then inject the reducer into the registry.
    /// Nothing is registered unless generation fully succeeds.
    pub(crate) fn create(registry: &Registry, spec: SliceSpec, extra: Option<&Generator>) -> Result<Pack> {
        spec.validate()?;

        let template = registry.template(&spec.template)?;
        let generator = match extra {
            Some(extra) => template.merged(extra),
            None => template,
        };
        let artifacts = generator.apply(&spec)?;
        let (reducer, initial) = injectable(&spec, &artifacts)?;

        debug!(
            slice = %spec.name,
            bucket = %spec.reducer_name,
            template = %spec.template,
            "pack generated"
        );
        registry.inject_reducer_into(&spec.reducer_name, reducer, initial)?;

        Ok(Pack {
            name: spec.name.clone(),
            spec: Arc::new(spec),
            generator,
            artifacts,
            registry: registry.clone(),
        })
    }

    /// Apply `extra` over this pack's artifacts and return the extended pack.
    ///
    /// Chaining is the same as merging: `p.with_generator(&a)?.with_generator(&b)?`
    /// equals `p.with_generator(&a.merged(&b))?`. Overriding `reducer` or
    /// `initialState` re-injects the slice.
    pub fn with_generator(&self, extra: &Generator) -> Result<Pack> {
        let artifacts = extra.apply_onto(self.artifacts.clone(), &self.spec)?;

        if extra.produces(REDUCER) || extra.produces(INITIAL_STATE) {
            let (reducer, initial) = injectable(&self.spec, &artifacts)?;
            self.registry
                .inject_reducer_into(&self.spec.reducer_name, reducer, initial)?;
        }

        debug!(slice = %self.name, added = ?extra.keys().collect::<Vec<_>>(), "pack extended");
        Ok(Pack {
            name: self.name.clone(),
            spec: Arc::clone(&self.spec),
            generator: self.generator.merged(extra),
            artifacts,
            registry: self.registry.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &SliceSpec {
        &self.spec
    }

    /// Every block applied so far, in order.
    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn artifact(&self, key: &str) -> Option<&Artifact> {
        self.artifacts.get(key)
    }

    pub fn state_names(&self) -> Option<&NameTree> {
        match self.artifact(STATE_NAMES)? {
            Artifact::Names(names) => Some(names),
            _ => None,
        }
    }

    pub fn action_names(&self) -> Option<&NameTree> {
        match self.artifact(ACTION_NAMES)? {
            Artifact::Names(names) => Some(names),
            _ => None,
        }
    }

    pub fn actions(&self) -> Option<&ActionCreators> {
        match self.artifact(ACTIONS)? {
            Artifact::Actions(actions) => Some(actions),
            _ => None,
        }
    }

    pub fn initial_state(&self) -> Option<&Value> {
        self.value(INITIAL_STATE)
    }

    pub fn reducer(&self) -> Option<&ActionMap> {
        match self.artifact(REDUCER)? {
            Artifact::Reducer(map) => Some(map),
            _ => None,
        }
    }

    pub fn selectors(&self) -> Option<&SelectorTree> {
        match self.artifact(SELECTORS)? {
            Artifact::Selectors(tree) => Some(tree),
            _ => None,
        }
    }

    /// A JSON artifact.
    pub fn value(&self, key: &str) -> Option<&Value> {
        match self.artifact(key)? {
            Artifact::Value(value) => Some(value),
            _ => None,
        }
    }

    /// A typed extension artifact added with `Artifact::custom`.
    pub fn custom<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        match self.artifact(key)? {
            Artifact::Custom(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Build an action through this pack's constructor `key`.
    pub fn action(&self, key: &str, payload: impl Into<Value>) -> Result<Action> {
        self.actions()
            .ok_or_else(|| missing(&self.spec, ACTIONS))?
            .create(key, payload)
    }

    /// Read selector `key` against the registry's current state.
    pub fn select(&self, key: &str) -> Option<Value> {
        self.selectors()?.select(key, &self.registry.state())
    }
}

fn missing(spec: &SliceSpec, artifact: &str) -> SlicePackError {
    SlicePackError::MissingArtifact {
        template: spec.template.to_string(),
        artifact: artifact.to_string(),
    }
}

/// The reducer and initial state a bundle must carry to be registered.
fn injectable<'a>(
    spec: &SliceSpec,
    artifacts: &'a BTreeMap<String, Artifact>,
) -> Result<(&'a ActionMap, &'a Value)> {
    let reducer = match artifacts.get(REDUCER) {
        Some(Artifact::Reducer(map)) => map,
        _ => return Err(missing(spec, REDUCER)),
    };
    let initial = match artifacts.get(INITIAL_STATE) {
        Some(Artifact::Value(value)) if value.is_object() || value.is_null() => value,
        _ => return Err(missing(spec, INITIAL_STATE)),
    };
    Ok((reducer, initial))
}
