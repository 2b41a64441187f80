//! File-backed slot storage scoped to one directory with `cap-std`.
//!
//! Each slot is `<slot>.json`. Writes go to a staging file first and are
//! renamed into place so a crash never leaves a half-written slot.

use std::io;
use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use uuid::Uuid;

use super::is_valid_slot;
use crate::domain::ports::{SlotStorage, SlotStorageError};

/// Slot storage rooted in a directory opened once at construction.
#[derive(Debug)]
pub struct CapFsSlotStorage {
    dir: Dir,
    root: PathBuf,
}

impl CapFsSlotStorage {
    /// Open (creating if needed) `root` as the storage directory.
    ///
    /// # Errors
    /// Returns the I/O error when the directory cannot be created or opened.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        Dir::create_ambient_dir_all(root, ambient_authority())?;
        let dir = Dir::open_ambient_dir(root, ambient_authority())?;
        Ok(Self {
            dir,
            root: root.to_path_buf(),
        })
    }

    /// Directory the slots live in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(slot: &str) -> Result<String, SlotStorageError> {
        if is_valid_slot(slot) {
            Ok(format!("{slot}.json"))
        } else {
            Err(SlotStorageError::invalid_slot(slot))
        }
    }

    fn io_error(&self, file: &str, error: io::Error) -> SlotStorageError {
        SlotStorageError::io(format!("{}: {error}", self.root.join(file).display()))
    }
}

impl SlotStorage for CapFsSlotStorage {
    fn read(&self, slot: &str) -> Result<Option<String>, SlotStorageError> {
        let file = Self::file_name(slot)?;
        match self.dir.read_to_string(&file) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(self.io_error(&file, error)),
        }
    }

    fn write(&self, slot: &str, contents: &str) -> Result<(), SlotStorageError> {
        let file = Self::file_name(slot)?;
        let staged = format!(".{slot}-{}.tmp", Uuid::new_v4().simple());
        self.dir
            .write(&staged, contents.as_bytes())
            .map_err(|error| self.io_error(&staged, error))?;
        if let Err(error) = self.dir.rename(&staged, &self.dir, &file) {
            let _cleanup = self.dir.remove_file(&staged);
            return Err(self.io_error(&file, error));
        }
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), SlotStorageError> {
        let file = Self::file_name(slot)?;
        match self.dir.remove_file(&file) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.io_error(&file, error)),
        }
    }
}
