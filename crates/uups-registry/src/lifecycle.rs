//! Registry lifecycle
//!
//! `Uninitialized -> Active { 1 }` on initialize, then `Active -> Active` for
//! every version authored in the catalog. Nothing returns to
//! `Uninitialized`.

use crate::error::RegistryError;
use crate::types::VersionTag;
use serde::{Deserialize, Serialize};

/// Registry lifecycle.
///
/// There is no terminal state and nothing returns to `Uninitialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryStatus {
    /// Deployed, `initialize` not yet called
    Uninitialized,
    /// A component with this version tag is bound
    Active {
        /// Tag of the bound component
        version: VersionTag,
    },
}

impl RegistryStatus {
    /// True once `initialize` has succeeded
    pub fn is_initialized(self) -> bool {
        matches!(self, RegistryStatus::Active { .. })
    }

    /// Tag of the bound component, if any
    pub fn version(self) -> Option<VersionTag> {
        match self {
            RegistryStatus::Uninitialized => None,
            RegistryStatus::Active { version } => Some(version),
        }
    }
}

/// Validates a lifecycle transition against the authored `versions`.
pub fn validate_transition(
    from: RegistryStatus,
    to: RegistryStatus,
    versions: &[VersionTag],
) -> Result<(), RegistryError> {
    if allowed_transitions(from, versions).contains(&to) {
        Ok(())
    } else {
        Err(RegistryError::IllegalTransition { from, to })
    }
}

/// Targets reachable from `from`, for the given set of authored versions
///
/// Initialization binds the first version only. An active registry may move
/// to any authored version, its current one and older ones included.
pub fn allowed_transitions(from: RegistryStatus, versions: &[VersionTag]) -> Vec<RegistryStatus> {
    match from {
        RegistryStatus::Uninitialized => versions
            .iter()
            .filter(|&&version| version == VersionTag::INITIAL)
            .take(1)
            .map(|&version| RegistryStatus::Active { version })
            .collect(),
        RegistryStatus::Active { .. } => versions
            .iter()
            .map(|&version| RegistryStatus::Active { version })
            .collect(),
    }
}

/// A value that can be set exactly once
///
/// Holds whatever `initialize` binds. Empty means uninitialized; there is no
/// separate flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOnce<T> {
    value: Option<T>,
}

impl<T> Default for InitOnce<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T> InitOnce<T> {
    /// Create an empty cell
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with `AlreadyInitialized` if a value was already set.
    pub fn check(&self) -> Result<(), RegistryError> {
        if self.value.is_some() {
            Err(RegistryError::AlreadyInitialized)
        } else {
            Ok(())
        }
    }

    /// Set the value. A second call fails and keeps the first value.
    pub fn set(&mut self, value: T) -> Result<&mut T, RegistryError> {
        self.check()?;
        Ok(self.value.insert(value))
    }

    /// The value, or `NotInitialized`
    pub fn get(&self) -> Result<&T, RegistryError> {
        self.value.as_ref().ok_or(RegistryError::NotInitialized)
    }

    /// Mutable access, or `NotInitialized`
    pub fn get_mut(&mut self) -> Result<&mut T, RegistryError> {
        self.value.as_mut().ok_or(RegistryError::NotInitialized)
    }

    /// The value, if set
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// True once a value was set
    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }
}
