//! In-memory slot storage.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::is_valid_slot;
use crate::domain::ports::{SlotStorage, SlotStorageError};

/// Slot storage that lives as long as the value.
#[derive(Debug, Default)]
pub struct MemorySlotStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlotStorage {
    fn check(slot: &str) -> Result<(), SlotStorageError> {
        if is_valid_slot(slot) {
            Ok(())
        } else {
            Err(SlotStorageError::invalid_slot(slot))
        }
    }
}

impl SlotStorage for MemorySlotStorage {
    fn read(&self, slot: &str) -> Result<Option<String>, SlotStorageError> {
        Self::check(slot)?;
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(slot).cloned())
    }

    fn write(&self, slot: &str, contents: &str) -> Result<(), SlotStorageError> {
        Self::check(slot)?;
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot.to_owned(), contents.to_owned());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), SlotStorageError> {
        Self::check(slot)?;
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(slot);
        Ok(())
    }
}
