//! UUPS box registry (uups-registry)
//!
//! Owner-gated component swapping over persistent state:
//! 1. **Components** are pure behaviour tagged with a version
//! 2. **The registry** owns the state and binds the active component to it
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use uups_registry::prelude::*;
//!
//! let registry = ComponentRegistry::new(Arc::new(ComponentCatalog::with_defaults()));
//! let owner = Principal::new();
//!
//! registry.initialize(owner)?;
//! assert_eq!(registry.version_tag()?, VersionTag(1));
//!
//! registry.upgrade_to(owner, &ImplementationId::new(BOX_V2))?;
//! registry.write(Principal::new(), 42)?;
//! assert_eq!(registry.read()?, 42);
//! # Ok::<(), RegistryError>(())
//! ```

// Core modules
pub mod api;
pub mod component;
pub mod config;
pub mod deployments;
pub mod error;
pub mod events;
pub mod guard;
pub mod lifecycle;
pub mod registry;
pub mod state;
pub mod types;

// Test harness
pub mod test_harness;

// Re-exports
pub use error::*;
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::UpgradeableBox;
    pub use crate::component::{BoxV1, BoxV2, ComponentCatalog, VersionedComponent, BOX_V1, BOX_V2};
    pub use crate::config::RegistryConfig;
    pub use crate::deployments::{Deployment, DeploymentBook};
    pub use crate::error::{ConfigError, LogError, RegistryError};
    pub use crate::events::{EventLog, EventRecord, RegistryEvent};
    pub use crate::guard::OwnershipGuard;
    pub use crate::lifecycle::{InitOnce, RegistryStatus};
    pub use crate::registry::{ComponentRegistry, RegistrySnapshot};
    pub use crate::state::{PersistentState, StorageLayout, StorageSlot};
    pub use crate::types::{ImplementationId, Principal, RegistryId, StoredValue, VersionTag};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
