//! Versioned components and the catalog they are published in
//!
//! Components are pure behaviour. They own no state; the registry hands them
//! its [`PersistentState`] on every call.

use crate::error::RegistryError;
use crate::state::{PersistentState, StorageLayout};
use crate::types::{ImplementationId, StoredValue, VersionTag};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of the read-only first box
pub const BOX_V1: &str = "box-v1";

/// Identifier of the box that adds a setter
pub const BOX_V2: &str = "box-v2";

/// A unit of behaviour tagged with an immutable version
///
/// Later versions may add capabilities but must keep reading the same
/// storage layout.
pub trait VersionedComponent: fmt::Debug + Send + Sync {
    /// Name this implementation is published under
    fn implementation_id(&self) -> ImplementationId;

    /// Immutable tag assigned when the component was authored
    fn version_tag(&self) -> VersionTag;

    /// Read the stored value
    fn read(&self, state: &PersistentState) -> StoredValue;

    /// Replace the stored value, returning the previous one.
    ///
    /// Components without a setter keep the default, which fails without
    /// touching `state`.
    fn write(
        &self,
        state: &mut PersistentState,
        new_value: StoredValue,
    ) -> Result<StoredValue, RegistryError> {
        let _ = (state, new_value);
        Err(RegistryError::UnsupportedOperation {
            operation: "write",
            version: self.version_tag(),
        })
    }

    /// Whether `write` is implemented
    fn supports_write(&self) -> bool {
        false
    }

    /// Slots this component expects to find
    fn storage_layout(&self) -> StorageLayout {
        PersistentState::layout()
    }
}

/// Read-only box
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxV1;

impl VersionedComponent for BoxV1 {
    fn implementation_id(&self) -> ImplementationId {
        ImplementationId::new(BOX_V1)
    }

    fn version_tag(&self) -> VersionTag {
        VersionTag(1)
    }

    fn read(&self, state: &PersistentState) -> StoredValue {
        state.stored_value()
    }
}

/// Box with a public setter
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxV2;

impl VersionedComponent for BoxV2 {
    fn implementation_id(&self) -> ImplementationId {
        ImplementationId::new(BOX_V2)
    }

    fn version_tag(&self) -> VersionTag {
        VersionTag(2)
    }

    fn read(&self, state: &PersistentState) -> StoredValue {
        state.stored_value()
    }

    fn write(
        &self,
        state: &mut PersistentState,
        new_value: StoredValue,
    ) -> Result<StoredValue, RegistryError> {
        Ok(state.replace_stored_value(new_value))
    }

    fn supports_write(&self) -> bool {
        true
    }
}

/// Catalog of authored component implementations
///
/// Entries are kept in authoring order, which is also ascending version order.
#[derive(Debug, Default, Clone)]
pub struct ComponentCatalog {
    components: IndexMap<ImplementationId, Arc<dyn VersionedComponent>>,
}

impl ComponentCatalog {
    /// Create new empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: IndexMap::new(),
        }
    }

    /// Create catalog holding both box versions
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut catalog = Self::new();
        catalog.components.insert(ImplementationId::new(BOX_V1), Arc::new(BoxV1));
        catalog.components.insert(ImplementationId::new(BOX_V2), Arc::new(BoxV2));
        catalog
    }

    /// Publish a component.
    ///
    /// Its tag must be strictly greater than every tag already published.
    pub fn register(&mut self, component: Arc<dyn VersionedComponent>) -> Result<(), RegistryError> {
        let id = component.implementation_id();
        if self.components.contains_key(&id) {
            return Err(RegistryError::DuplicateImplementation(id));
        }
        let tag = component.version_tag();
        if let Some(latest) = self.latest() {
            let latest = latest.version_tag();
            if tag <= latest {
                return Err(RegistryError::NonMonotonicVersion { tag, latest });
            }
        }
        self.components.insert(id, component);
        Ok(())
    }

    /// Look up an implementation
    #[inline]
    pub fn get(&self, id: &ImplementationId) -> Option<Arc<dyn VersionedComponent>> {
        self.components.get(id).cloned()
    }

    /// Look up an implementation, failing with `UnknownImplementation`
    pub fn resolve(&self, id: &ImplementationId) -> Result<Arc<dyn VersionedComponent>, RegistryError> {
        self.get(id)
            .ok_or_else(|| RegistryError::UnknownImplementation(id.clone()))
    }

    /// Most recently authored implementation
    pub fn latest(&self) -> Option<Arc<dyn VersionedComponent>> {
        self.components.values().last().cloned()
    }

    /// True if `id` is published
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &ImplementationId) -> bool {
        self.components.contains_key(id)
    }

    /// Identifiers in authoring order
    pub fn ids(&self) -> Vec<&ImplementationId> {
        self.components.keys().collect()
    }

    /// Components in authoring order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn VersionedComponent>> {
        self.components.values()
    }

    /// Number of published components
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True when nothing is published
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
