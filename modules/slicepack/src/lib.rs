//! Declarative slice packs.
//!
//! A `SliceSpec` names a slice, the registry bucket it lives in, a template,
//! and optionally a payload map describing the shape of its main value.
//! `create_pack` turns it into a `Pack`: derived state and action names,
//! action constructors, an initial-state fragment, a reducer, and memoized
//! selectors. The pack's reducer is injected into a `Registry`, which
//! composes every bucket into one root reducer and keeps the store's
//! reducer current as slices are added.
//!
//! ```
//! use serde_json::json;
//! use slicepack::{Registry, SliceSpec};
//!
//! let registry = Registry::new();
//! let user = registry
//!     .create_pack(SliceSpec::builder().name("user").reducer_name("app").build())
//!     .unwrap();
//!
//! registry.dispatch(user.action("run", json!(null)).unwrap()).unwrap();
//! assert_eq!(user.select("isLoading"), Some(json!(true)));
//! ```

pub mod actions;
pub mod file_config;
pub mod generator;
pub mod names;
pub mod pack;
pub mod path;
pub mod reducer;
pub mod registry;
pub mod selectors;
pub mod spec;
pub mod templates;

pub use actions::{ActionCreator, ActionCreators};
pub use generator::{Artifact, Generator, GeneratorBlock};
pub use pack::Pack;
pub use path::{resolve, LeafDescriptor, LeafRule, PayloadMap, PayloadNode};
pub use reducer::{ActionMap, RootReducer, StoreState};
pub use registry::Registry;
pub use selectors::{Selector, SelectorNode, SelectorTree};
pub use spec::{SliceSpec, Template};

pub use slicepack_common::{Action, Config, Result, SlicePackError};

/// `create_pack` against the process-wide registry.
pub fn create_pack(spec: SliceSpec) -> Result<Pack> {
    Registry::global().create_pack(spec)
}
