//! Deployment side-table
//!
//! Deploy and upgrade scripts look registries up here by identifier, or ask
//! for the most recent one, instead of relying on any global lookup.

use crate::component::ComponentCatalog;
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::events::EventLog;
use crate::registry::ComponentRegistry;
use crate::types::{now_timestamp, ImplementationId, Principal, RegistryId, VersionTag};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// A recorded deployment
#[derive(Debug, Clone)]
pub struct Deployment {
    /// The deployed registry
    pub registry: Arc<ComponentRegistry>,
    /// Principal that deployed and initialized it
    pub deployer: Principal,
    /// Unix seconds
    pub deployed_at: u64,
}

/// Registries in deployment order
#[derive(Debug)]
pub struct DeploymentBook {
    config: RegistryConfig,
    catalog: Arc<ComponentCatalog>,
    events: Arc<EventLog>,
    deployments: RwLock<IndexMap<RegistryId, Deployment>>,
}

impl DeploymentBook {
    /// Create empty book with default configuration
    pub fn new(catalog: Arc<ComponentCatalog>) -> Self {
        Self::with_config(RegistryConfig::default(), catalog)
    }

    /// Create empty book; every deployed registry gets `config`
    pub fn with_config(config: RegistryConfig, catalog: Arc<ComponentCatalog>) -> Self {
        Self {
            config,
            catalog,
            events: Arc::new(EventLog::new()),
            deployments: RwLock::new(IndexMap::new()),
        }
    }

    /// Create a registry, initialize it as `deployer` and record it.
    ///
    /// A registry that fails to initialize is not recorded.
    pub fn deploy(&self, deployer: Principal) -> Result<Arc<ComponentRegistry>, RegistryError> {
        let registry = Arc::new(ComponentRegistry::with_event_log(
            self.config.clone(),
            Arc::clone(&self.catalog),
            Arc::clone(&self.events),
        ));
        registry.initialize(deployer)?;

        tracing::info!(registry = %registry.id(), deployer = %deployer, "registry deployed");
        self.deployments.write().insert(
            registry.id(),
            Deployment {
                registry: Arc::clone(&registry),
                deployer,
                deployed_at: now_timestamp(),
            },
        );
        Ok(registry)
    }

    /// Look up a deployment, failing with `UnknownRegistry`
    pub fn get(&self, id: RegistryId) -> Result<Arc<ComponentRegistry>, RegistryError> {
        self.deployments
            .read()
            .get(&id)
            .map(|d| Arc::clone(&d.registry))
            .ok_or(RegistryError::UnknownRegistry(id))
    }

    /// Most recently deployed registry
    pub fn most_recent(&self) -> Result<Arc<ComponentRegistry>, RegistryError> {
        self.deployments
            .read()
            .last()
            .map(|(_, d)| Arc::clone(&d.registry))
            .ok_or(RegistryError::NoDeployments)
    }

    /// Upgrade the most recently deployed registry to `implementation`
    pub fn upgrade_most_recent(
        &self,
        caller: Principal,
        implementation: &ImplementationId,
    ) -> Result<VersionTag, RegistryError> {
        let registry = self.most_recent()?;
        let version = registry.upgrade_to(caller, implementation)?;
        tracing::info!(registry = %registry.id(), implementation = %implementation, version = %version, "most recent deployment upgraded");
        Ok(version)
    }

    /// All deployments, oldest first
    pub fn list(&self) -> Vec<Deployment> {
        self.deployments.read().values().cloned().collect()
    }

    /// Number of deployments
    pub fn len(&self) -> usize {
        self.deployments.read().len()
    }

    /// True before the first deploy
    pub fn is_empty(&self) -> bool {
        self.deployments.read().is_empty()
    }

    /// Log shared by every registry in this book
    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.events
    }
}
