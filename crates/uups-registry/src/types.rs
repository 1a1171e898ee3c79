//! Identifier and value types shared by every registry module.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Value held in the single persistent storage slot.
///
/// The widest native unsigned integer; `StoredValue::MAX` is the largest
/// value a box can hold.
pub type StoredValue = u128;

/// Identity of a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(pub Uuid);

impl Principal {
    /// Fresh random principal
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The null principal. Never a valid owner.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// True for [`Principal::nil`]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for Principal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of one deployed registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistryId(pub Uuid);

impl RegistryId {
    /// Fresh random registry id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegistryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one recorded event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Fresh random event id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

/// Name under which a component implementation is published.
///
/// This is what `upgrade_to` callers pass to select the next implementation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImplementationId(String);

impl ImplementationId {
    /// Wrap a published name
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The published name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for ImplementationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Version tag assigned to a component when it is authored
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(pub u32);

impl VersionTag {
    /// Tag of the component `initialize` binds
    pub const INITIAL: VersionTag = VersionTag(1);

    /// The raw tag
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn now_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_principal_is_nil() {
        assert!(Principal::nil().is_nil());
        assert!(!Principal::new().is_nil());
    }

    #[test]
    fn principals_are_distinct() {
        assert_ne!(Principal::new(), Principal::new());
    }

    #[test]
    fn version_tag_display() {
        assert_eq!(VersionTag(2).to_string(), "2");
        assert_eq!(VersionTag(7).get(), 7);
    }

    #[test]
    fn implementation_id_serializes_as_string() {
        let id = ImplementationId::from("box-v2");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"box-v2\"");
        assert_eq!(id.as_str(), "box-v2");
    }
}
