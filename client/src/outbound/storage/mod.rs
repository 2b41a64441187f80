//! Slot storage adapters.
//!
//! - [`MemorySlotStorage`]: process-local map, used when no storage
//!   directory is configured and throughout the tests.
//! - [`CapFsSlotStorage`]: one JSON file per slot inside a capability-scoped
//!   directory.

mod cap_fs;
mod memory;

pub use cap_fs::CapFsSlotStorage;
pub use memory::MemorySlotStorage;

/// Whether `slot` is a plain lowercase name safe to use as a file stem.
pub(crate) fn is_valid_slot(slot: &str) -> bool {
    !slot.is_empty()
        && slot
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}
