//! Error types for the upgradeable registry
//!
//! Every failure here is a caller precondition violation detected
//! synchronously; nothing is transient and nothing is retried.

use crate::lifecycle::RegistryStatus;
use crate::types::{ImplementationId, Principal, RegistryId, VersionTag};

/// Main registry error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// `initialize` called on an already initialized registry
    #[error("registry already initialized")]
    AlreadyInitialized,

    /// Operation needs an initialized registry
    #[error("registry not initialized")]
    NotInitialized,

    /// Privileged call from someone other than the owner
    #[error("caller {caller} is not the owner")]
    NotOwner {
        /// Who made the call
        caller: Principal,
    },

    /// Active component lacks the requested capability
    #[error("operation `{operation}` unsupported by component version {version}")]
    UnsupportedOperation {
        /// Name of the missing capability
        operation: &'static str,
        /// Tag of the active component
        version: VersionTag,
    },

    /// Ownership would be handed to the null principal
    #[error("invalid owner: {0}")]
    InvalidOwner(Principal),

    /// Implementation identifier not present in the catalog
    #[error("unknown implementation: {0}")]
    UnknownImplementation(ImplementationId),

    /// Target component expects a storage layout the live state cannot satisfy
    #[error("storage layout of {implementation} incompatible: expected prefix {expected}, found {found}")]
    IncompatibleLayout {
        implementation: ImplementationId,
        /// Fingerprint of the live layout
        expected: String,
        /// Fingerprint the target declares
        found: String,
    },

    /// Implementation identifier registered twice
    #[error("implementation already registered: {0}")]
    DuplicateImplementation(ImplementationId),

    /// Version tag reused or out of authoring order
    #[error("version tag {tag} must be greater than latest {latest}")]
    NonMonotonicVersion { tag: VersionTag, latest: VersionTag },

    /// Lifecycle move not permitted for the authored versions
    #[error("illegal lifecycle transition {from:?} -> {to:?}")]
    IllegalTransition {
        from: RegistryStatus,
        to: RegistryStatus,
    },

    /// Deployment side-table has no such registry
    #[error("unknown registry: {0}")]
    UnknownRegistry(RegistryId),

    /// Deployment side-table is empty
    #[error("no registry deployed")]
    NoDeployments,
}

impl RegistryError {
    /// Check if error stems from the ownership check
    #[inline]
    #[must_use]
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Self::NotOwner { .. } | Self::InvalidOwner(_))
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`crate::config::RegistryConfig`]
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed, but a value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Event log errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// Hash chain broken at the given record
    #[error("event log integrity violation at record {index}")]
    IntegrityViolation { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_failures() {
        let caller = Principal::new();
        assert!(RegistryError::NotOwner { caller }.is_authorization_failure());
        assert!(RegistryError::InvalidOwner(Principal::nil()).is_authorization_failure());
        assert!(!RegistryError::AlreadyInitialized.is_authorization_failure());
    }

    #[test]
    fn unsupported_operation_message() {
        let err = RegistryError::UnsupportedOperation {
            operation: "write",
            version: VersionTag(1),
        };
        assert_eq!(
            err.to_string(),
            "operation `write` unsupported by component version 1"
        );
    }
}
