use std::env;

use crate::error::{Result, SlicePackError};

/// Registry configuration loaded from environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Log every dispatched action at `info` level.
    pub logger_on: bool,

    /// Start the registry with reducer updates frozen, so a bootstrap phase
    /// can inject many slices and release once.
    pub frozen_boot: bool,
}

impl Config {
    /// Load configuration from environment variables. Every variable is optional.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            logger_on: bool_env("SLICEPACK_LOGGER")?.unwrap_or(false),
            frozen_boot: bool_env("SLICEPACK_FROZEN_BOOT")?.unwrap_or(false),
        })
    }

    pub fn with_logger(mut self, on: bool) -> Self {
        self.logger_on = on;
        self
    }

    pub fn with_frozen_boot(mut self, frozen: bool) -> Self {
        self.frozen_boot = frozen;
        self
    }
}

fn bool_env(key: &str) -> Result<Option<bool>> {
    match env::var(key) {
        Ok(raw) => parse_bool(&raw)
            .map(Some)
            .ok_or_else(|| SlicePackError::config(format!("{key} must be a boolean, got `{raw}`"))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
