//! Registry configuration

use crate::component::BOX_V1;
use crate::error::ConfigError;
use crate::types::ImplementationId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Registry configuration
///
/// ```toml
/// initial_implementation = "box-v1"
/// enforce_layout_compatibility = true
/// trace_events = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Component bound by `initialize`; must carry version tag 1
    pub initial_implementation: ImplementationId,
    /// Refuse upgrades to components with an incompatible storage layout
    pub enforce_layout_compatibility: bool,
    /// Mirror recorded events to `tracing`
    pub trace_events: bool,
}

impl RegistryConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the component `initialize` binds
    #[inline]
    #[must_use]
    pub fn with_initial_implementation(mut self, id: impl Into<ImplementationId>) -> Self {
        self.initial_implementation = id.into();
        self
    }

    /// Enable or disable the storage layout check on upgrade
    #[inline]
    #[must_use]
    pub fn with_layout_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_layout_compatibility = enforce;
        self
    }

    /// Enable or disable mirroring events to `tracing`
    #[inline]
    #[must_use]
    pub fn with_event_tracing(mut self, trace: bool) -> Self {
        self.trace_events = trace;
        self
    }

    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_implementation.as_str().trim().is_empty() {
            return Err(ConfigError::Invalid(
                "initial_implementation must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_implementation: ImplementationId::new(BOX_V1),
            enforce_layout_compatibility: true,
            trace_events: true,
        }
    }
}
