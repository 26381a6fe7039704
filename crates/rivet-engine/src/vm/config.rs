//! Engine configuration (`rivet.toml`)
//!
//! Loaded the same way package manifests are: a serde struct with defaults for
//! every field, parsed with `toml`, then validated.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rivet_sdk::PointerSize;

use crate::vm::defaults;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid config: {0}")]
    ValidationError(String),
}

/// Runtime-wide settings of the invocation bridge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// ABI width of the runtime in bits (32 or 64)
    pub pointer_size: u32,

    /// Run the access check stage; disabling it is a bring-up aid only
    pub enforce_access: bool,

    /// Emit show-call diagnostics on the `rivet::calls` target
    pub trace_calls: bool,

    /// Maximum formal parameter count accepted when linking a method
    pub max_arguments: usize,

    /// Frames skipped by the reflective entry point when none are given
    pub default_num_frames: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pointer_size: PointerSize::NATIVE.bits(),
            enforce_access: true,
            trace_calls: false,
            max_arguments: defaults::DEFAULT_MAX_ARGUMENTS,
            default_num_frames: defaults::DEFAULT_NUM_FRAMES,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Validate field ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if PointerSize::from_bits(self.pointer_size).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "pointer_size must be 32 or 64, got {}",
                self.pointer_size
            )));
        }

        if self.max_arguments == 0 || self.max_arguments > defaults::MAX_ARGUMENTS_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "max_arguments must be in 1..={}, got {}",
                defaults::MAX_ARGUMENTS_LIMIT,
                self.max_arguments
            )));
        }

        if self.default_num_frames > defaults::MAX_NUM_FRAMES {
            return Err(ConfigError::ValidationError(format!(
                "default_num_frames must be at most {}, got {}",
                defaults::MAX_NUM_FRAMES,
                self.default_num_frames
            )));
        }

        Ok(())
    }

    /// ABI width as a typed value; validated configs always have one
    pub fn pointer_size(&self) -> PointerSize {
        PointerSize::from_bits(self.pointer_size).unwrap_or(PointerSize::NATIVE)
    }
}
