//! Persistent state owned by the registry
//!
//! [`PersistentState`] outlives every component swap. Components only ever
//! see it by reference, and the registry is the only place that constructs it.
//! [`StorageLayout`] describes the slots a component expects so that a swap
//! can be refused before it reinterprets existing data.

use crate::types::StoredValue;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fixed-layout record shared by every component version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentState {
    stored_value: StoredValue,
}

impl PersistentState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current value of slot 0
    #[inline]
    pub fn stored_value(&self) -> StoredValue {
        self.stored_value
    }

    /// Overwrite slot 0, returning the previous value
    #[inline]
    pub(crate) fn replace_stored_value(&mut self, value: StoredValue) -> StoredValue {
        std::mem::replace(&mut self.stored_value, value)
    }

    /// Layout of the live record
    pub fn layout() -> StorageLayout {
        StorageLayout::new(vec![StorageSlot::new(
            0,
            "stored_value",
            StoredValue::BITS as u16,
        )])
    }
}

/// One slot descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageSlot {
    /// Position in storage
    pub slot: u32,
    /// Field name
    pub name: String,
    /// Width in bits
    pub bits: u16,
}

impl StorageSlot {
    /// Describe one slot
    pub fn new(slot: u32, name: impl Into<String>, bits: u16) -> Self {
        Self {
            slot,
            name: name.into(),
            bits,
        }
    }
}

/// Ordered slot descriptors a component reads and writes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLayout {
    slots: Vec<StorageSlot>,
}

impl StorageLayout {
    /// Layout from slots in storage order
    pub fn new(slots: Vec<StorageSlot>) -> Self {
        Self { slots }
    }

    /// Slots in storage order
    pub fn slots(&self) -> &[StorageSlot] {
        &self.slots
    }

    /// Append-only compatibility.
    ///
    /// `next` must keep every slot of `self` at the same position with the same
    /// name and width. New slots may only follow the existing ones.
    pub fn is_compatible_with(&self, next: &StorageLayout) -> bool {
        next.slots.len() >= self.slots.len()
            && self.slots.iter().zip(&next.slots).all(|(a, b)| a == b)
    }

    /// SHA-256 over the slot descriptors, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for slot in &self.slots {
            hasher.update(slot.slot.to_le_bytes());
            hasher.update(slot.bits.to_le_bytes());
            hasher.update(slot.name.as_bytes());
            hasher.update([0]);
        }
        hex::encode(hasher.finalize())
    }
}
