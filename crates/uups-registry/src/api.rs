//! Caller-facing box interface
//!
//! The surface a script or another system invokes. [`ComponentRegistry`]
//! implements it by forwarding to its own operations.

use crate::error::RegistryError;
use crate::registry::ComponentRegistry;
use crate::types::{ImplementationId, Principal, StoredValue, VersionTag};

/// Calls a caller makes against one deployed box
pub trait UpgradeableBox {
    /// The caller becomes owner
    fn initialize(&self, caller: Principal) -> Result<(), RegistryError>;

    fn get_value(&self) -> Result<StoredValue, RegistryError>;

    /// Active version tag
    fn get_version(&self) -> Result<VersionTag, RegistryError>;

    /// Available once a version with a setter is active
    fn set_value(&self, caller: Principal, new_value: StoredValue) -> Result<(), RegistryError>;

    /// Owner-only implementation swap
    fn upgrade_to(
        &self,
        caller: Principal,
        implementation: &ImplementationId,
    ) -> Result<VersionTag, RegistryError>;
}

impl UpgradeableBox for ComponentRegistry {
    fn initialize(&self, caller: Principal) -> Result<(), RegistryError> {
        ComponentRegistry::initialize(self, caller)
    }

    fn get_value(&self) -> Result<StoredValue, RegistryError> {
        self.read()
    }

    fn get_version(&self) -> Result<VersionTag, RegistryError> {
        self.version_tag()
    }

    fn set_value(&self, caller: Principal, new_value: StoredValue) -> Result<(), RegistryError> {
        self.write(caller, new_value)
    }

    fn upgrade_to(
        &self,
        caller: Principal,
        implementation: &ImplementationId,
    ) -> Result<VersionTag, RegistryError> {
        ComponentRegistry::upgrade_to(self, caller, implementation)
    }
}
