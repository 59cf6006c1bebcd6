//! The declarative slice specification.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slicepack_common::{Result, SlicePackError};
use typed_builder::TypedBuilder;

use crate::path::PayloadMap;

/// Transform applied to an incoming payload value against the previous state value.
pub type ModifyValueFn = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// Derivation applied when a value is read through a selector.
pub type FormatSelectorFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Normalizes an inbound payload before the reducer sees it.
pub type FormatPayloadFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Which generator set builds the slice. Unspecified means `Request`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Request,
    Simple,
    /// A generator set registered with `Registry::register_template`.
    #[serde(untagged)]
    Custom(String),
}

impl Template {
    pub fn as_str(&self) -> &str {
        match self {
            Template::Request => "request",
            Template::Simple => "simple",
            Template::Custom(name) => name,
        }
    }
}

impl From<&str> for Template {
    fn from(name: &str) -> Self {
        match name {
            "request" => Template::Request,
            "simple" => Template::Simple,
            other => Template::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable input to slice generation.
///
/// ```
/// use slicepack::{SliceSpec, Template};
///
/// let spec = SliceSpec::builder()
///     .name("user")
///     .reducer_name("app")
///     .template(Template::Request)
///     .build();
/// assert_eq!(spec.name, "user");
/// ```
#[derive(Clone, TypedBuilder)]
pub struct SliceSpec {
    /// Unique base identifier; every generated name derives from it.
    #[builder(setter(into))]
    pub name: String,

    /// Registry bucket the slice's reducer and initial state land in.
    #[builder(setter(into))]
    pub reducer_name: String,

    #[builder(default)]
    pub template: Template,

    /// Seed for the `value` slot (Simple) and fallback seed for `result` (Request).
    /// With a payload map the seed must be an object; leaf initials are laid over it.
    #[builder(default, setter(strip_option))]
    pub default_initial: Option<Value>,

    /// Seed for the `result` slot (Request).
    #[builder(default, setter(strip_option))]
    pub result_initial: Option<Value>,

    #[builder(default, setter(strip_option))]
    pub payload_map: Option<PayloadMap>,

    #[builder(default, setter(strip_option))]
    pub format_payload: Option<FormatPayloadFn>,
}

impl SliceSpec {
    /// Required fields must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SlicePackError::MissingField("name"));
        }
        if self.reducer_name.trim().is_empty() {
            return Err(SlicePackError::MissingField("reducer_name"));
        }
        Ok(())
    }

    /// The seed for the slice's main slot under its template.
    pub fn seed(&self) -> Option<&Value> {
        match self.template {
            Template::Simple => self.default_initial.as_ref(),
            _ => self.result_initial.as_ref().or(self.default_initial.as_ref()),
        }
    }

    /// Run `format_payload` if the spec has one.
    pub fn format_inbound(&self, payload: &Value) -> Value {
        match &self.format_payload {
            Some(format) => format(payload.clone()),
            None => payload.clone(),
        }
    }
}

impl fmt::Debug for SliceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceSpec")
            .field("name", &self.name)
            .field("reducer_name", &self.reducer_name)
            .field("template", &self.template)
            .field("default_initial", &self.default_initial)
            .field("result_initial", &self.result_initial)
            .field("payload_map", &self.payload_map)
            .field("format_payload", &self.format_payload.is_some())
            .finish()
    }
}
