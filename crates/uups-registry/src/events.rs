//! Registry notifications and the hash-chained log that records them
//!
//! Records are appended while the emitting registry still holds its lock, so
//! log order is operation order. Each record hashes its predecessor;
//! [`EventLog::verify_integrity`] walks the chain.

use crate::error::LogError;
use crate::types::{now_timestamp, EventId, ImplementationId, Principal, RegistryId, StoredValue, VersionTag};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A notification emitted by a registry
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// First and only successful `initialize`
    Initialized {
        owner: Principal,
    },
    /// Owner handed the upgrade right to someone else
    OwnershipTransferred {
        previous_owner: Principal,
        new_owner: Principal,
    },
    /// Stored value replaced through the active component
    ValueUpdated {
        previous: StoredValue,
        new: StoredValue,
        caller: Principal,
    },
    /// Active component swapped by the owner
    Upgraded {
        previous_version: VersionTag,
        new_version: VersionTag,
        implementation: ImplementationId,
        caller: Principal,
    },
}

impl RegistryEvent {
    /// Short name used in traces
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::Initialized { .. } => "initialized",
            RegistryEvent::OwnershipTransferred { .. } => "ownership_transferred",
            RegistryEvent::ValueUpdated { .. } => "value_updated",
            RegistryEvent::Upgraded { .. } => "upgraded",
        }
    }
}

/// One link of the hash chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique id of this record
    pub event_id: EventId,
    /// Position in the log, starting at 0
    pub sequence: u64,
    /// Unix seconds
    pub timestamp: u64,
    /// Registry that emitted the event
    pub registry_id: RegistryId,
    /// The notification itself
    pub event: RegistryEvent,
    /// Hash of the preceding record, zeroes for the first
    pub prev_hash: [u8; 32],
    /// SHA-256 over this record and `prev_hash`
    pub hash: [u8; 32],
}

/// Append-only event log, shareable between registries
#[derive(Debug, Default)]
pub struct EventLog {
    inner: Mutex<Vec<EventRecord>>,
}

impl EventLog {
    /// Create empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and chain it to the previous record
    pub fn append(&self, registry_id: RegistryId, event: RegistryEvent) -> EventId {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map(|e| e.hash).unwrap_or([0u8; 32]);
        let mut record = EventRecord {
            event_id: EventId::new(),
            sequence: guard.len() as u64,
            timestamp: now_timestamp(),
            registry_id,
            event,
            prev_hash,
            hash: [0u8; 32],
        };
        record.hash = compute_hash(&record);
        let event_id = record.event_id;
        guard.push(record);
        event_id
    }

    /// All records, every registry
    pub fn events(&self) -> Vec<EventRecord> {
        self.inner.lock().clone()
    }

    /// Events emitted by one registry, in order
    pub fn events_for(&self, registry_id: RegistryId) -> Vec<RegistryEvent> {
        self.inner
            .lock()
            .iter()
            .filter(|r| r.registry_id == registry_id)
            .map(|r| r.event.clone())
            .collect()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Walk the hash chain from the first record
    pub fn verify_integrity(&self) -> Result<(), LogError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for (index, e) in guard.iter().enumerate() {
            if e.prev_hash != prev || e.sequence != index as u64 {
                return Err(LogError::IntegrityViolation { index });
            }
            if e.hash != compute_hash(e) {
                return Err(LogError::IntegrityViolation { index });
            }
            prev = e.hash;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn tamper(&self, index: usize, event: RegistryEvent) {
        self.inner.lock()[index].event = event;
    }
}

/// Emit `event` as a structured trace
pub(crate) fn trace(registry_id: RegistryId, event: &RegistryEvent) {
    match event {
        RegistryEvent::Initialized { owner } => {
            tracing::info!(target: "uups_registry::events", registry = %registry_id, owner = %owner, "initialized");
        }
        RegistryEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        } => {
            tracing::info!(
                target: "uups_registry::events",
                registry = %registry_id,
                previous_owner = %previous_owner,
                new_owner = %new_owner,
                "ownership transferred"
            );
        }
        RegistryEvent::ValueUpdated {
            previous,
            new,
            caller,
        } => {
            tracing::info!(
                target: "uups_registry::events",
                registry = %registry_id,
                previous = %previous,
                new = %new,
                caller = %caller,
                "value updated"
            );
        }
        RegistryEvent::Upgraded {
            previous_version,
            new_version,
            implementation,
            caller,
        } => {
            tracing::info!(
                target: "uups_registry::events",
                registry = %registry_id,
                previous_version = %previous_version,
                new_version = %new_version,
                implementation = %implementation,
                caller = %caller,
                "upgraded"
            );
        }
    }
}

fn compute_hash(record: &EventRecord) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(record.event_id.0.as_bytes());
    hasher.update(record.sequence.to_le_bytes());
    hasher.update(record.timestamp.to_le_bytes());
    hasher.update(record.registry_id.0.as_bytes());
    hasher.update(serde_json::to_vec(&record.event).unwrap_or_default());
    hasher.update([0]);
    hasher.update(record.prev_hash);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn updated(previous: StoredValue, new: StoredValue) -> RegistryEvent {
        RegistryEvent::ValueUpdated {
            previous,
            new,
            caller: Principal::nil(),
        }
    }

    #[test]
    fn append_chains_hashes() {
        let log = EventLog::new();
        let registry = RegistryId::new();
        log.append(registry, RegistryEvent::Initialized { owner: Principal::new() });
        log.append(registry, updated(0, 1));

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].prev_hash, [0u8; 32]);
        assert_eq!(events[1].prev_hash, events[0].hash);
        assert_eq!(events[1].sequence, 1);
        assert!(log.verify_integrity().is_ok());
    }

    #[test]
    fn tampering_is_detected() {
        let log = EventLog::new();
        let registry = RegistryId::new();
        log.append(registry, updated(0, 1));
        log.append(registry, updated(1, 2));

        log.tamper(0, updated(0, 99));
        assert_eq!(
            log.verify_integrity(),
            Err(LogError::IntegrityViolation { index: 0 })
        );
    }

    #[test]
    fn events_for_filters_by_registry() {
        let log = EventLog::new();
        let (a, b) = (RegistryId::new(), RegistryId::new());
        log.append(a, updated(0, 1));
        log.append(b, updated(0, 2));
        log.append(a, updated(1, 3));

        assert_eq!(log.events_for(a), vec![updated(0, 1), updated(1, 3)]);
        assert_eq!(log.events_for(b), vec![updated(0, 2)]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn event_serializes_with_kind_tag() {
        let json = serde_json::to_value(RegistryEvent::Initialized { owner: Principal::nil() }).unwrap();
        assert_eq!(json["kind"], "initialized");
    }

    #[test]
    fn event_names() {
        assert_eq!(updated(0, 1).name(), "value_updated");
    }
}
