//! The slice registry and root reducer assembler.
//!
//! Every pack injects its reducer and initial state into a bucket here.
//! The registry composes all buckets into one `RootReducer`, owns the
//! store once it exists, and swaps the store's reducer whenever a new
//! bucket or handler arrives.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use serde_json::{Map, Value};
use slicepack_common::{Action, Config, Result, SlicePackError};
use slicepack_engine::Store;
use tracing::{debug, info, warn};

use crate::generator::Generator;
use crate::pack::Pack;
use crate::reducer::{ActionMap, RootReducer, StoreState};
use crate::spec::{SliceSpec, Template};
use crate::templates;

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// Shared handle to one registry. Clones see the same state.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Mutex<RegistryState>>,
}

struct RegistryState {
    reducers: BTreeMap<String, ActionMap>,
    initial_state: BTreeMap<String, Map<String, Value>>,
    external: BTreeMap<String, ActionMap>,
    external_initial: BTreeMap<String, Value>,
    store: Option<Store<StoreState>>,
    prevent_reducer_updates: bool,
    pending_update: bool,
    templates: BTreeMap<String, Generator>,
    logger_on: bool,
    rebuilds: u64,
}

impl RegistryState {
    fn compose(&self) -> RootReducer {
        let mut buckets = self.external.clone();
        for (name, map) in &self.reducers {
            buckets.entry(name.clone()).or_default().merge(map);
        }

        let mut seeds = self.external_initial.clone();
        for (name, initial) in &self.initial_state {
            seeds.insert(name.clone(), Value::Object(initial.clone()));
        }

        RootReducer::new(buckets, seeds)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        let templates = BTreeMap::from([
            (Template::Request.to_string(), templates::request::generator()),
            (Template::Simple.to_string(), templates::simple::generator()),
        ]);

        Self {
            inner: Arc::new(Mutex::new(RegistryState {
                reducers: BTreeMap::new(),
                initial_state: BTreeMap::new(),
                external: BTreeMap::new(),
                external_initial: BTreeMap::new(),
                store: None,
                prevent_reducer_updates: config.frozen_boot,
                pending_update: false,
                templates,
                logger_on: config.logger_on,
                rebuilds: 0,
            })),
        }
    }

    /// Build from `SLICEPACK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_config(&Config::from_env()?))
    }

    /// Process-wide registry for callers that do not thread one through.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    // ---------------------------------------------------------------------
    // Templates and packs
    // ---------------------------------------------------------------------

    /// Add (or replace) a named generator set usable as `Template::Custom(name)`.
    pub fn register_template(&self, name: impl Into<String>, generator: Generator) {
        let name = name.into();
        debug!(template = %name, blocks = generator.len(), "template registered");
        self.lock().templates.insert(name, generator);
    }

    pub fn template(&self, template: &Template) -> Result<Generator> {
        self.lock()
            .templates
            .get(template.as_str())
            .cloned()
            .ok_or_else(|| SlicePackError::UnknownTemplate(template.to_string()))
    }

    pub fn create_pack(&self, spec: SliceSpec) -> Result<Pack> {
        Pack::create(self, spec, None)
    }

    /// Generate a pack with `extra` blocks applied on top of its template.
    #[deprecated(note = "use `create_pack(spec)?.with_generator(extra)`")]
    pub fn with_generator(&self, spec: SliceSpec, extra: &Generator) -> Result<Pack> {
        Pack::create(self, spec, Some(extra))
    }

    // ---------------------------------------------------------------------
    // Injection
    // ---------------------------------------------------------------------

    /// Merge a slice's handlers and initial slots into `bucket`.
    ///
    /// Same action type or same slot key overwrites, so injecting the same
    /// slice twice is harmless. While updates are frozen the rebuild is
    /// deferred until `release_reducer_updates`.
    pub fn inject_reducer_into(&self, bucket: &str, map: &ActionMap, initial: &Value) -> Result<()> {
        let slots = match initial {
            Value::Object(slots) => slots.clone(),
            Value::Null => Map::new(),
            _ => {
                return Err(SlicePackError::config(format!(
                    "initial state for bucket `{bucket}` must be an object"
                )))
            }
        };

        let frozen = {
            let mut state = self.lock();
            let replaced = state.reducers.entry(bucket.to_string()).or_default().merge(map);
            if !replaced.is_empty() {
                warn!(bucket, ?replaced, "injection replaced existing handlers");
            }
            state
                .initial_state
                .entry(bucket.to_string())
                .or_default()
                .extend(slots);

            if state.prevent_reducer_updates {
                state.pending_update = true;
            }
            state.prevent_reducer_updates
        };

        debug!(bucket, handlers = map.len(), frozen, "reducer injected");
        if frozen {
            return Ok(());
        }
        self.update_reducer()
    }

    /// Recompose the root reducer and hand it to the store, if there is one.
    pub fn update_reducer(&self) -> Result<()> {
        let (root, store) = {
            let mut state = self.lock();
            if state.prevent_reducer_updates {
                state.pending_update = true;
                return Ok(());
            }
            state.pending_update = false;
            state.rebuilds += 1;
            (state.compose(), state.store.clone())
        };

        debug!(buckets = ?root.bucket_names(), "root reducer rebuilt");
        if let Some(store) = store {
            store.replace_reducer(Arc::new(root))?;
        }
        Ok(())
    }

    pub fn freeze_reducer_updates(&self) {
        self.lock().prevent_reducer_updates = true;
    }

    /// Unfreeze, then rebuild once if anything was injected in the meantime.
    pub fn release_reducer_updates(&self) -> Result<()> {
        let pending = {
            let mut state = self.lock();
            state.prevent_reducer_updates = false;
            state.pending_update
        };
        if pending {
            self.update_reducer()?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Store
    // ---------------------------------------------------------------------

    /// Record buckets managed outside the slice system and return the
    /// composed reducer. The first call creates the store.
    pub fn get_root_reducer(
        &self,
        extra_reducers: BTreeMap<String, ActionMap>,
        extra_initial_state: BTreeMap<String, Value>,
    ) -> Result<Arc<RootReducer>> {
        let (root, store, logger_on, frozen) = {
            let mut state = self.lock();
            state.external.extend(extra_reducers);
            state.external_initial.extend(extra_initial_state);
            (
                Arc::new(state.compose()),
                state.store.clone(),
                state.logger_on,
                state.prevent_reducer_updates,
            )
        };

        match store {
            Some(_) if frozen => self.lock().pending_update = true,
            Some(store) => {
                self.lock().rebuilds += 1;
                store.replace_reducer(root.clone())?;
            }
            None => {
                let store = Store::new(root.clone(), StoreState::new())?.with_logger(logger_on);
                info!(buckets = ?root.bucket_names(), "store created");
                let mut state = self.lock();
                if state.store.is_none() {
                    state.store = Some(store);
                }
            }
        }
        Ok(root)
    }

    pub fn store(&self) -> Option<Store<StoreState>> {
        self.lock().store.clone()
    }

    /// Dispatch through the store, creating it first if needed.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        let store = match self.store() {
            Some(store) => store,
            None => {
                self.get_root_reducer(BTreeMap::new(), BTreeMap::new())?;
                self.store()
                    .ok_or_else(|| SlicePackError::config("store was not created"))?
            }
        };
        store.dispatch(action)?;
        Ok(())
    }

    /// Current store state, or an empty state before the store exists.
    pub fn state(&self) -> Arc<StoreState> {
        self.store()
            .map(|store| store.state())
            .unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------------

    /// Registered bucket names, external ones included.
    pub fn bucket_names(&self) -> Vec<String> {
        let state = self.lock();
        let mut names: Vec<String> = state
            .reducers
            .keys()
            .chain(state.initial_state.keys())
            .chain(state.external.keys())
            .chain(state.external_initial.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Bucket → handled action types.
    pub fn reducers(&self) -> BTreeMap<String, Vec<String>> {
        let root = self.lock().compose();
        root.bucket_names()
            .into_iter()
            .map(|bucket| {
                let types = root
                    .action_map(bucket)
                    .map(|map| map.action_types().map(str::to_string).collect())
                    .unwrap_or_default();
                (bucket.to_string(), types)
            })
            .collect()
    }

    pub fn action_types(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .compose()
            .action_map(bucket)
            .map(|map| map.action_types().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Every bucket's seed, as one JSON object.
    pub fn initial_state(&self) -> Value {
        let state = self.lock();
        let mut out = Map::new();
        for (bucket, seed) in &state.external_initial {
            out.insert(bucket.clone(), seed.clone());
        }
        for (bucket, slots) in &state.initial_state {
            out.insert(bucket.clone(), Value::Object(slots.clone()));
        }
        Value::Object(out)
    }

    /// How many times the root reducer has been recomposed.
    pub fn rebuild_count(&self) -> u64 {
        self.lock().rebuilds
    }

    pub fn is_frozen(&self) -> bool {
        self.lock().prevent_reducer_updates
    }

    pub fn has_pending_update(&self) -> bool {
        self.lock().pending_update
    }

    pub fn logger_on(&self) -> bool {
        self.lock().logger_on
    }

    pub fn set_logger(&self, on: bool) {
        let store = {
            let mut state = self.lock();
            state.logger_on = on;
            state.store.clone()
        };
        if let Some(store) = store {
            store.set_logger(on);
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Registry")
            .field("buckets", &state.reducers.keys().collect::<Vec<_>>())
            .field("templates", &state.templates.keys().collect::<Vec<_>>())
            .field("frozen", &state.prevent_reducer_updates)
            .field("pending_update", &state.pending_update)
            .field("rebuilds", &state.rebuilds)
            .field("has_store", &state.store.is_some())
            .finish()
    }
}
