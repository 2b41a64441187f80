//! Driven port for small named durable slots.

use super::define_port_error;

define_port_error! {
    /// Errors raised by slot storage adapters.
    pub enum SlotStorageError {
        /// The backing store could not be read or written.
        Io { message: String } =>
            "slot storage i/o failed: {message}",
        /// The slot name is not usable by this adapter.
        InvalidSlot { slot: String } =>
            "slot name is invalid: {slot}",
    }
}

/// Port for reading and writing named JSON slots.
///
/// Calls are synchronous; slots are a few kilobytes at most.
#[cfg_attr(test, mockall::automock)]
pub trait SlotStorage: Send + Sync {
    /// Read a slot, returning `None` when it does not exist.
    fn read(&self, slot: &str) -> Result<Option<String>, SlotStorageError>;

    /// Replace a slot's contents.
    fn write(&self, slot: &str, contents: &str) -> Result<(), SlotStorageError>;

    /// Remove a slot. Removing a missing slot succeeds.
    fn remove(&self, slot: &str) -> Result<(), SlotStorageError>;
}
