//! Shared types for SlicePack: the action wire shape, the error taxonomy,
//! JSON path helpers, and environment configuration.

pub mod action;
pub mod config;
pub mod error;
pub mod value;

pub use action::Action;
pub use config::Config;
pub use error::{Result, SlicePackError};
pub use serde_json::Value;
