use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::pack::Pack;
use crate::path::PayloadMap;
use crate::registry::Registry;
use crate::spec::{SliceSpec, Template};

/// TOML file declaring slices. Closures (`modify_value`, `format_selector`,
/// `format_payload`) have no file form and stay in code.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SliceFile {
    /// Overrides the registry's action logging when present.
    #[serde(default)]
    pub logger: Option<bool>,

    #[serde(default, rename = "slice")]
    pub slices: Vec<SliceDecl>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SliceDecl {
    pub name: String,
    pub reducer_name: String,
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub default_initial: Option<Value>,
    #[serde(default)]
    pub result_initial: Option<Value>,
    #[serde(default)]
    pub payload_map: Option<Value>,
}

impl SliceDecl {
    pub fn to_spec(&self) -> slicepack_common::Result<SliceSpec> {
        let mut spec = SliceSpec::builder()
            .name(self.name.clone())
            .reducer_name(self.reducer_name.clone())
            .template(self.template.clone())
            .build();
        spec.default_initial = self.default_initial.clone();
        spec.result_initial = self.result_initial.clone();
        spec.payload_map = self
            .payload_map
            .as_ref()
            .map(PayloadMap::from_value)
            .transpose()?;
        spec.validate()?;
        Ok(spec)
    }
}

impl SliceFile {
    /// Create every declared slice in one frozen batch, so the root reducer
    /// is rebuilt once. Updates are released even when a slice fails.
    ///
    /// When the registry is already frozen the slices join the caller's
    /// batch and updates stay frozen.
    pub fn register_all(&self, registry: &Registry) -> Result<Vec<Pack>> {
        if let Some(on) = self.logger {
            registry.set_logger(on);
        }

        let owns_batch = !registry.is_frozen();
        if owns_batch {
            registry.freeze_reducer_updates();
        }
        let created: Result<Vec<Pack>> = self
            .slices
            .iter()
            .map(|decl| {
                let spec = decl
                    .to_spec()
                    .with_context(|| format!("Invalid slice `{}`", decl.name))?;
                registry
                    .create_pack(spec)
                    .with_context(|| format!("Failed to create slice `{}`", decl.name))
            })
            .collect();
        if owns_batch {
            registry.release_reducer_updates()?;
        }
        created
    }
}

/// Parse a slice file from TOML text.
pub fn parse_slices(content: &str) -> Result<SliceFile> {
    toml::from_str(content).context("Failed to parse slice file")
}

/// Load and parse a slice file from disk.
pub fn load_slices(path: &Path) -> Result<SliceFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read slice file: {}", path.display()))?;
    parse_slices(&content).with_context(|| format!("In slice file: {}", path.display()))
}
