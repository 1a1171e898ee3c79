//! Testing utilities for the uups workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use std::sync::Arc;
use uups_registry::component::{ComponentCatalog, VersionedComponent, BOX_V2};
use uups_registry::config::RegistryConfig;
use uups_registry::registry::ComponentRegistry;
use uups_registry::state::{PersistentState, StorageLayout, StorageSlot};
use uups_registry::{ImplementationId, Principal, StoredValue, VersionTag};

/// Config with tracing off so test output stays quiet
pub fn quiet_config() -> RegistryConfig {
    RegistryConfig::new().with_event_tracing(false)
}

pub fn default_catalog() -> Arc<ComponentCatalog> {
    Arc::new(ComponentCatalog::with_defaults())
}

/// Fresh, uninitialized registry
pub fn fresh_registry() -> ComponentRegistry {
    ComponentRegistry::with_config(quiet_config(), default_catalog())
}

/// Defaults plus box-v3 and box-v4
pub fn layout_catalog() -> Arc<ComponentCatalog> {
    let mut catalog = ComponentCatalog::with_defaults();
    catalog.register(Arc::new(ExtendedLayoutBox)).unwrap();
    catalog.register(Arc::new(RetypedLayoutBox)).unwrap();
    Arc::new(catalog)
}

/// Registry initialized and upgraded to box-v2, over [`layout_catalog`]
pub fn layout_registry() -> (ComponentRegistry, Principal) {
    let registry = ComponentRegistry::with_config(quiet_config(), layout_catalog());
    let owner = Principal::new();
    registry.initialize(owner).unwrap();
    registry.upgrade_to(owner, &ImplementationId::new(BOX_V2)).unwrap();
    (registry, owner)
}

/// Registry initialized by a fresh owner, box-v1 active
pub fn initialized_registry() -> (ComponentRegistry, Principal) {
    let registry = fresh_registry();
    let owner = Principal::new();
    registry.initialize(owner).unwrap();
    (registry, owner)
}

/// Registry initialized and upgraded to box-v2 by its owner
pub fn upgraded_registry() -> (ComponentRegistry, Principal) {
    let (registry, owner) = initialized_registry();
    registry.upgrade_to(owner, &ImplementationId::new(BOX_V2)).unwrap();
    (registry, owner)
}

/// Component whose slot 0 is narrower than the live layout
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowLayoutBox;

impl VersionedComponent for NarrowLayoutBox {
    fn implementation_id(&self) -> ImplementationId {
        ImplementationId::new("box-narrow")
    }

    fn version_tag(&self) -> VersionTag {
        VersionTag(3)
    }

    fn read(&self, state: &PersistentState) -> StoredValue {
        state.stored_value()
    }

    fn storage_layout(&self) -> StorageLayout {
        StorageLayout::new(vec![StorageSlot::new(0, "stored_value", 64)])
    }
}

/// Component that appends a slot after the live layout
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtendedLayoutBox;

impl VersionedComponent for ExtendedLayoutBox {
    fn implementation_id(&self) -> ImplementationId {
        ImplementationId::new("box-v3")
    }

    fn version_tag(&self) -> VersionTag {
        VersionTag(3)
    }

    fn read(&self, state: &PersistentState) -> StoredValue {
        state.stored_value()
    }

    fn storage_layout(&self) -> StorageLayout {
        let mut slots = PersistentState::layout().slots().to_vec();
        slots.push(StorageSlot::new(1, "label", 256));
        StorageLayout::new(slots)
    }
}

/// Component that reuses slot 1 with a different name and width than
/// [`ExtendedLayoutBox`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RetypedLayoutBox;

impl VersionedComponent for RetypedLayoutBox {
    fn implementation_id(&self) -> ImplementationId {
        ImplementationId::new("box-v4")
    }

    fn version_tag(&self) -> VersionTag {
        VersionTag(4)
    }

    fn read(&self, state: &PersistentState) -> StoredValue {
        state.stored_value()
    }

    fn storage_layout(&self) -> StorageLayout {
        let mut slots = PersistentState::layout().slots().to_vec();
        slots.push(StorageSlot::new(1, "counter", 8));
        StorageLayout::new(slots)
    }
}
