//! Single-owner authorization

use crate::error::RegistryError;
use crate::types::Principal;

/// Tracks the one principal allowed to make privileged calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipGuard {
    owner: Principal,
}

impl OwnershipGuard {
    /// Create a guard owned by `owner`. The null principal is rejected.
    pub fn new(owner: Principal) -> Result<Self, RegistryError> {
        if owner.is_nil() {
            return Err(RegistryError::InvalidOwner(owner));
        }
        Ok(Self { owner })
    }

    /// Current owner
    #[inline]
    pub fn owner(&self) -> Principal {
        self.owner
    }

    /// Fail with `NotOwner` unless `caller` is the owner
    #[inline]
    pub fn check_owner(&self, caller: Principal) -> Result<(), RegistryError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(RegistryError::NotOwner { caller })
        }
    }

    /// Hand ownership to `new_owner`, returning the previous owner.
    ///
    /// The caller check runs before `new_owner` is validated.
    pub fn transfer_ownership(
        &mut self,
        caller: Principal,
        new_owner: Principal,
    ) -> Result<Principal, RegistryError> {
        self.check_owner(caller)?;
        if new_owner.is_nil() {
            return Err(RegistryError::InvalidOwner(new_owner));
        }
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }
}
