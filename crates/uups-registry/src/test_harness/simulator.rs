//! Registry simulator
//!
//! Two phases:
//! 1. Sequential: a seeded random stream of calls from a small principal pool
//!    runs against a registry and a shadow model. Any divergence in outcome,
//!    value, version or owner is a violation.
//! 2. Concurrent: tokio tasks hammer one registry with writes and upgrades.
//!    Afterwards the event log must verify and the stored value must equal
//!    the last recorded `ValueUpdated`.

use crate::component::{ComponentCatalog, BOX_V1, BOX_V2};
use crate::config::RegistryConfig;
use crate::error::RegistryError;
use crate::events::RegistryEvent;
use crate::registry::ComponentRegistry;
use crate::types::{ImplementationId, Principal, StoredValue, VersionTag};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Calls issued in the sequential phase
    pub total_operations: u64,
    /// Size of the caller pool
    pub principals: usize,
    /// Tasks spawned in the concurrent phase
    pub concurrent_tasks: usize,
    /// Calls per task in the concurrent phase
    pub operations_per_task: u64,
    /// Stop conditions
    pub stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 1000,
            principals: 4,
            concurrent_tasks: 8,
            operations_per_task: 250,
            stop_on_first_violation: true,
        }
    }
}

/// One simulated call
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SimulatedOperation {
    Initialize(Principal),
    Read,
    Version,
    Write(Principal, StoredValue),
    /// Caller and target implementation
    Upgrade(Principal, ImplementationId),
    /// Caller and new owner
    Transfer(Principal, Principal),
}

/// A divergence between registry and model
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum Violation {
    /// Registry and model disagreed on the outcome of a call
    OutcomeMismatch {
        step: u64,
        operation: SimulatedOperation,
        expected: Result<(), RegistryError>,
        actual: Result<(), RegistryError>,
    },
    /// Observable state differs after a call
    StateMismatch {
        step: u64,
        operation: SimulatedOperation,
        detail: String,
    },
    /// Event log hash chain broken
    LogIntegrity(String),
    /// Final value does not match the last recorded write
    LostWrite {
        stored: StoredValue,
        last_recorded: Option<StoredValue>,
    },
}

/// Counters collected during a run
#[derive(Debug, Clone, Default)]
pub struct SimulatorStats {
    /// Sequential calls issued
    pub operations_attempted: u64,
    /// Sequential calls that returned `Ok`
    pub operations_succeeded: u64,
    /// Sequential calls that returned an error
    pub operations_rejected: u64,
    /// Successful swaps in the sequential phase
    pub upgrades_applied: u64,
    /// Successful writes in the sequential phase
    pub writes_applied: u64,
    /// Calls issued by all tasks in the concurrent phase
    pub concurrent_operations: u64,
}

/// Final report from simulator
#[derive(Debug, Clone)]
pub struct SimulatorReport {
    /// Configuration the run used
    pub config: SimulatorConfig,
    pub stats: SimulatorStats,
    /// Everything that diverged, in detection order
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// True when no violation was recorded
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human-readable report
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Registry Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Operations Attempted: {}\n", self.stats.operations_attempted));
        report.push_str(&format!("Operations Succeeded: {}\n", self.stats.operations_succeeded));
        report.push_str(&format!("Operations Rejected: {}\n", self.stats.operations_rejected));
        report.push_str(&format!("Upgrades Applied: {}\n", self.stats.upgrades_applied));
        report.push_str(&format!("Writes Applied: {}\n", self.stats.writes_applied));
        report.push_str(&format!("Concurrent Operations: {}\n", self.stats.concurrent_operations));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {:?}\n", i + 1, v));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Reference model of the registry
#[derive(Debug, Default)]
struct Model {
    owner: Option<Principal>,
    version: Option<VersionTag>,
    value: StoredValue,
}

impl Model {
    fn apply(&mut self, operation: &SimulatedOperation) -> Result<(), RegistryError> {
        match operation {
            SimulatedOperation::Initialize(caller) => {
                if self.owner.is_some() {
                    return Err(RegistryError::AlreadyInitialized);
                }
                self.owner = Some(*caller);
                self.version = Some(VersionTag(1));
                Ok(())
            }
            SimulatedOperation::Read | SimulatedOperation::Version => {
                self.version.map(|_| ()).ok_or(RegistryError::NotInitialized)
            }
            SimulatedOperation::Write(_, value) => match self.version {
                None => Err(RegistryError::NotInitialized),
                Some(version) if version < VersionTag(2) => Err(RegistryError::UnsupportedOperation {
                    operation: "write",
                    version,
                }),
                Some(_) => {
                    self.value = *value;
                    Ok(())
                }
            },
            SimulatedOperation::Upgrade(caller, implementation) => {
                let owner = self.owner.ok_or(RegistryError::NotInitialized)?;
                if *caller != owner {
                    return Err(RegistryError::NotOwner { caller: *caller });
                }
                self.version = Some(match implementation.as_str() {
                    BOX_V1 => VersionTag(1),
                    BOX_V2 => VersionTag(2),
                    _ => return Err(RegistryError::UnknownImplementation(implementation.clone())),
                });
                Ok(())
            }
            SimulatedOperation::Transfer(caller, new_owner) => {
                let owner = self.owner.ok_or(RegistryError::NotInitialized)?;
                if *caller != owner {
                    return Err(RegistryError::NotOwner { caller: *caller });
                }
                if new_owner.is_nil() {
                    return Err(RegistryError::InvalidOwner(*new_owner));
                }
                self.owner = Some(*new_owner);
                Ok(())
            }
        }
    }
}

/// Run the registry simulator
pub async fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let principals: Vec<Principal> = (0..config.principals.max(1))
        .map(|_| Principal(uuid::Builder::from_random_bytes(rng.gen()).into_uuid()))
        .collect();

    let mut stats = SimulatorStats::default();
    let mut violations = Vec::new();

    let catalog = Arc::new(ComponentCatalog::with_defaults());
    let sim_config = RegistryConfig::new().with_event_tracing(false);
    let registry = ComponentRegistry::with_config(sim_config.clone(), Arc::clone(&catalog));
    let mut model = Model::default();

    // Phase 1: sequential calls checked against the model
    for step in 0..config.total_operations {
        let operation = generate_operation(&mut rng, &principals);
        let expected = model.apply(&operation);
        let actual = execute_operation(&registry, &operation);

        stats.operations_attempted += 1;
        match (&actual, &operation) {
            (Ok(()), SimulatedOperation::Upgrade(..)) => stats.upgrades_applied += 1,
            (Ok(()), SimulatedOperation::Write(..)) => stats.writes_applied += 1,
            _ => {}
        }
        if actual.is_ok() {
            stats.operations_succeeded += 1;
        } else {
            stats.operations_rejected += 1;
        }

        if expected != actual {
            violations.push(Violation::OutcomeMismatch {
                step,
                operation: operation.clone(),
                expected,
                actual,
            });
        } else if let Some(detail) = compare_state(&registry, &model) {
            violations.push(Violation::StateMismatch {
                step,
                operation,
                detail,
            });
        }

        if config.stop_on_first_violation && !violations.is_empty() {
            break;
        }
    }

    if let Err(e) = registry.event_log().verify_integrity() {
        violations.push(Violation::LogIntegrity(e.to_string()));
    }

    // Phase 2: concurrent writers and upgraders on one registry
    if violations.is_empty() || !config.stop_on_first_violation {
        let shared = Arc::new(ComponentRegistry::with_config(sim_config, catalog));
        let owner = principals[0];
        if let Err(e) = shared
            .initialize(owner)
            .and_then(|()| shared.upgrade_to(owner, &BOX_V2.into()).map(|_| ()))
        {
            violations.push(Violation::LogIntegrity(format!("setup failed: {e}")));
        } else {
            stats.concurrent_operations = run_concurrent_phase(&config, &shared, &principals).await;
            violations.extend(check_concurrent_outcome(&shared));
        }
    }

    SimulatorReport {
        config,
        stats,
        violations,
    }
}

async fn run_concurrent_phase(
    config: &SimulatorConfig,
    registry: &Arc<ComponentRegistry>,
    principals: &[Principal],
) -> u64 {
    let mut tasks = tokio::task::JoinSet::new();
    for task in 0..config.concurrent_tasks {
        let registry = Arc::clone(registry);
        let principals = principals.to_vec();
        let operations = config.operations_per_task;
        let seed = config.seed.wrapping_add(task as u64 + 1);
        tasks.spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed);
            for _ in 0..operations {
                let caller = principals[rng.gen_range(0..principals.len())];
                // Rejections are expected here; only the final state is checked.
                let _ = match rng.gen_range(0..10) {
                    0 => registry.upgrade_to(caller, &BOX_V2.into()).map(|_| ()),
                    1 => registry.read().map(|_| ()),
                    _ => registry.write(caller, rng.gen()),
                };
                tokio::task::yield_now().await;
            }
            operations
        });
    }

    let mut total = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(count) => total += count,
            Err(e) => tracing::error!("simulator task failed: {}", e),
        }
    }
    total
}

fn check_concurrent_outcome(registry: &ComponentRegistry) -> Vec<Violation> {
    let mut violations = Vec::new();
    if let Err(e) = registry.event_log().verify_integrity() {
        violations.push(Violation::LogIntegrity(e.to_string()));
    }

    let events = registry.events();
    let last_recorded = events.iter().rev().find_map(|e| match e {
        RegistryEvent::ValueUpdated { new, .. } => Some(*new),
        _ => None,
    });
    // Each ValueUpdated must start from the value the previous one left.
    let mut current: StoredValue = 0;
    for event in &events {
        if let RegistryEvent::ValueUpdated { previous, new, .. } = event {
            if *previous != current {
                violations.push(Violation::LostWrite {
                    stored: *previous,
                    last_recorded: Some(current),
                });
                break;
            }
            current = *new;
        }
    }

    let stored = registry.snapshot().stored_value;
    if stored != last_recorded.unwrap_or(0) {
        violations.push(Violation::LostWrite {
            stored,
            last_recorded,
        });
    }
    violations
}

fn generate_operation(rng: &mut StdRng, principals: &[Principal]) -> SimulatedOperation {
    let pick = |rng: &mut StdRng| principals[rng.gen_range(0..principals.len())];
    match rng.gen_range(0..100) {
        0..=7 => SimulatedOperation::Initialize(pick(rng)),
        8..=27 => SimulatedOperation::Read,
        28..=37 => SimulatedOperation::Version,
        38..=69 => {
            let value = match rng.gen_range(0..10) {
                0 => 0,
                1 => StoredValue::MAX,
                _ => rng.gen(),
            };
            SimulatedOperation::Write(pick(rng), value)
        }
        70..=91 => {
            let implementation = match rng.gen_range(0..10) {
                0..=5 => BOX_V2,
                6..=8 => BOX_V1,
                _ => "box-missing",
            };
            SimulatedOperation::Upgrade(pick(rng), implementation.into())
        }
        _ => {
            let new_owner = if rng.gen_bool(0.1) {
                Principal::nil()
            } else {
                pick(rng)
            };
            SimulatedOperation::Transfer(pick(rng), new_owner)
        }
    }
}

fn execute_operation(
    registry: &ComponentRegistry,
    operation: &SimulatedOperation,
) -> Result<(), RegistryError> {
    match operation {
        SimulatedOperation::Initialize(caller) => registry.initialize(*caller),
        SimulatedOperation::Read => registry.read().map(|_| ()),
        SimulatedOperation::Version => registry.version_tag().map(|_| ()),
        SimulatedOperation::Write(caller, value) => registry.write(*caller, *value),
        SimulatedOperation::Upgrade(caller, implementation) => {
            registry.upgrade_to(*caller, implementation).map(|_| ())
        }
        SimulatedOperation::Transfer(caller, new_owner) => {
            registry.transfer_ownership(*caller, *new_owner)
        }
    }
}

fn compare_state(registry: &ComponentRegistry, model: &Model) -> Option<String> {
    let snapshot = registry.snapshot();
    if snapshot.owner != model.owner {
        return Some(format!("owner {:?} != model {:?}", snapshot.owner, model.owner));
    }
    if snapshot.status.version() != model.version {
        return Some(format!(
            "version {:?} != model {:?}",
            snapshot.status.version(),
            model.version
        ));
    }
    if snapshot.stored_value != model.value {
        return Some(format!(
            "value {} != model {}",
            snapshot.stored_value, model.value
        ));
    }
    None
}
