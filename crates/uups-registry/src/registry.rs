//! The component registry
//!
//! [`ComponentRegistry`] is the only entry point callers use. It owns the
//! [`PersistentState`], binds the active component to it on every call and
//! enforces the owner-gated swap protocol.
//!
//! # Serialization
//!
//! All mutable parts live behind one `RwLock`. Mutating calls hold the write
//! lock from precondition check to event append, so a reader never sees a
//! half-applied swap and two upgrades cannot both act on the same owner
//! snapshot. A failed call leaves every field as it found it.

use crate::component::{ComponentCatalog, VersionedComponent};
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::events::{self, EventLog, RegistryEvent};
use crate::guard::OwnershipGuard;
use crate::lifecycle::{validate_transition, InitOnce, RegistryStatus};
use crate::state::{PersistentState, StorageLayout};
use crate::types::{ImplementationId, Principal, RegistryId, StoredValue, VersionTag};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Point-in-time view of a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Registry the snapshot was taken from
    pub registry_id: RegistryId,
    /// Lifecycle state
    pub status: RegistryStatus,
    /// `None` until initialized
    pub owner: Option<Principal>,
    /// Active implementation, `None` until initialized
    pub implementation: Option<ImplementationId>,
    /// Raw stored value
    pub stored_value: StoredValue,
}

/// What `initialize` binds: the owner and the active component
#[derive(Debug)]
struct Binding {
    guard: OwnershipGuard,
    active: Arc<dyn VersionedComponent>,
}

#[derive(Debug)]
struct RegistryInner {
    binding: InitOnce<Binding>,
    state: PersistentState,
}

impl RegistryInner {
    fn status(&self) -> RegistryStatus {
        match self.binding.value() {
            Some(binding) => RegistryStatus::Active {
                version: binding.active.version_tag(),
            },
            None => RegistryStatus::Uninitialized,
        }
    }

    fn active(&self) -> Result<&Arc<dyn VersionedComponent>, RegistryError> {
        Ok(&self.binding.get()?.active)
    }

    fn owner(&self) -> Option<Principal> {
        self.binding.value().map(|b| b.guard.owner())
    }
}

/// Upgradeable box registry
#[derive(Debug)]
pub struct ComponentRegistry {
    id: RegistryId,
    config: RegistryConfig,
    catalog: Arc<ComponentCatalog>,
    inner: RwLock<RegistryInner>,
    events: Arc<EventLog>,
}

impl ComponentRegistry {
    /// Create an uninitialized registry with default configuration
    pub fn new(catalog: Arc<ComponentCatalog>) -> Self {
        Self::with_config(RegistryConfig::default(), catalog)
    }

    /// Create an uninitialized registry with its own event log
    pub fn with_config(config: RegistryConfig, catalog: Arc<ComponentCatalog>) -> Self {
        Self::with_event_log(config, catalog, Arc::new(EventLog::new()))
    }

    /// Create a registry that records into a shared log
    pub fn with_event_log(
        config: RegistryConfig,
        catalog: Arc<ComponentCatalog>,
        events: Arc<EventLog>,
    ) -> Self {
        Self {
            id: RegistryId::new(),
            config,
            catalog,
            inner: RwLock::new(RegistryInner {
                binding: InitOnce::new(),
                state: PersistentState::new(),
            }),
            events,
        }
    }

    /// Make `caller` the owner and bind the initial component.
    ///
    /// Succeeds once per registry; every later call fails with
    /// `AlreadyInitialized` whoever makes it. The initial component must
    /// carry the first version tag, otherwise this fails with
    /// `IllegalTransition` and the registry stays uninitialized.
    pub fn initialize(&self, caller: Principal) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        inner.binding.check()?;

        let guard = OwnershipGuard::new(caller)?;
        let component = self.catalog.resolve(&self.config.initial_implementation)?;
        self.check_layout(&PersistentState::layout(), component.as_ref())?;
        let next = RegistryStatus::Active {
            version: component.version_tag(),
        };
        validate_transition(inner.status(), next, &self.authored_versions())?;

        inner.binding.set(Binding {
            guard,
            active: component,
        })?;
        self.emit(RegistryEvent::Initialized { owner: caller });
        Ok(())
    }

    /// Current stored value, as read by the active component
    pub fn read(&self) -> Result<StoredValue, RegistryError> {
        let inner = self.inner.read();
        let value = inner.active()?.read(&inner.state);
        tracing::debug!(registry = %self.id, value = %value, "read");
        Ok(value)
    }

    /// Store `new_value` through the active component.
    ///
    /// There is no caller check: any principal may write once a component
    /// with a setter is active.
    pub fn write(&self, caller: Principal, new_value: StoredValue) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        let component = Arc::clone(inner.active()?);
        let previous = component.write(&mut inner.state, new_value)?;
        self.emit(RegistryEvent::ValueUpdated {
            previous,
            new: new_value,
            caller,
        });
        Ok(())
    }

    /// Version tag of the active component
    pub fn version_tag(&self) -> Result<VersionTag, RegistryError> {
        Ok(self.inner.read().active()?.version_tag())
    }

    /// Swap the active component for `target`. Owner only.
    pub fn upgrade(
        &self,
        caller: Principal,
        target: Arc<dyn VersionedComponent>,
    ) -> Result<VersionTag, RegistryError> {
        let mut inner = self.inner.write();
        self.authorize(&inner, caller)?;
        self.rebind(&mut inner, caller, target)
    }

    /// Swap to the catalog implementation named `implementation`. Owner only.
    ///
    /// The caller is checked before the name is resolved.
    pub fn upgrade_to(
        &self,
        caller: Principal,
        implementation: &ImplementationId,
    ) -> Result<VersionTag, RegistryError> {
        let mut inner = self.inner.write();
        self.authorize(&inner, caller)?;
        let target = self.catalog.resolve(implementation)?;
        self.rebind(&mut inner, caller, target)
    }

    /// Hand ownership to `new_owner`. Owner only.
    pub fn transfer_ownership(
        &self,
        caller: Principal,
        new_owner: Principal,
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        let binding = inner.binding.get_mut()?;
        let previous_owner = binding
            .guard
            .transfer_ownership(caller, new_owner)
            .map_err(|e| self.rejected("ownership transfer", caller, e))?;
        self.emit(RegistryEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        Ok(())
    }

    /// Stable identifier of this registry
    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// Configuration fixed at construction
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Implementations `upgrade_to` can select
    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    /// Log this registry records into, possibly shared
    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Events emitted by this registry, in order
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.events_for(self.id)
    }

    /// Current owner, `None` before `initialize`
    pub fn owner(&self) -> Option<Principal> {
        self.inner.read().owner()
    }

    /// Lifecycle state
    pub fn status(&self) -> RegistryStatus {
        self.inner.read().status()
    }

    /// Identifier of the active implementation
    pub fn implementation(&self) -> Option<ImplementationId> {
        self.inner
            .read()
            .binding
            .value()
            .map(|b| b.active.implementation_id())
    }

    /// Consistent view of status, owner, implementation and value
    pub fn snapshot(&self) -> RegistrySnapshot {
        let inner = self.inner.read();
        RegistrySnapshot {
            registry_id: self.id,
            status: inner.status(),
            owner: inner.owner(),
            implementation: inner.binding.value().map(|b| b.active.implementation_id()),
            stored_value: inner.state.stored_value(),
        }
    }

    fn authorize(&self, inner: &RegistryInner, caller: Principal) -> Result<(), RegistryError> {
        inner
            .binding
            .get()?
            .guard
            .check_owner(caller)
            .map_err(|e| self.rejected("upgrade", caller, e))
    }

    fn rejected(&self, operation: &str, caller: Principal, error: RegistryError) -> RegistryError {
        if error.is_authorization_failure() {
            tracing::warn!(registry = %self.id, caller = %caller, error = %error, "{} rejected", operation);
        } else {
            tracing::debug!(registry = %self.id, caller = %caller, error = %error, "{} failed", operation);
        }
        error
    }

    /// `target` must keep every slot of `live` in place; it may append.
    fn check_layout(
        &self,
        live: &StorageLayout,
        target: &dyn VersionedComponent,
    ) -> Result<(), RegistryError> {
        if !self.config.enforce_layout_compatibility {
            return Ok(());
        }
        let found = target.storage_layout();
        if live.is_compatible_with(&found) {
            Ok(())
        } else {
            Err(RegistryError::IncompatibleLayout {
                implementation: target.implementation_id(),
                expected: live.fingerprint(),
                found: found.fingerprint(),
            })
        }
    }

    fn authored_versions(&self) -> Vec<VersionTag> {
        self.catalog.iter().map(|c| c.version_tag()).collect()
    }

    fn rebind(
        &self,
        inner: &mut RegistryInner,
        caller: Principal,
        target: Arc<dyn VersionedComponent>,
    ) -> Result<VersionTag, RegistryError> {
        let current = Arc::clone(inner.active()?);
        let previous_version = current.version_tag();

        self.check_layout(&current.storage_layout(), target.as_ref())?;

        let new_version = target.version_tag();
        validate_transition(
            inner.status(),
            RegistryStatus::Active { version: new_version },
            &self.authored_versions(),
        )?;

        let implementation = target.implementation_id();
        inner.binding.get_mut()?.active = target;
        self.emit(RegistryEvent::Upgraded {
            previous_version,
            new_version,
            implementation,
            caller,
        });
        Ok(new_version)
    }

    fn emit(&self, event: RegistryEvent) {
        if self.config.trace_events {
            events::trace(self.id, &event);
        }
        self.events.append(self.id, event);
    }
}
