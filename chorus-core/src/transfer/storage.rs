//! Local storage for the partial copy of a bundle being pulled.
//!
//! Storage layout:
//! ```text
//! <storage>/
//! └── pullData/
//!     └── <bundle_id>.bundle     # bytes received so far, contiguous from 0
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::TransferError;

/// Folder under the storage path holding in-progress pulls.
pub const STORAGE_FOLDER_NAME: &str = "pullData";

/// File extension for bundle files.
const BUNDLE_EXTENSION: &str = "bundle";

/// Owns the partial bundle file of one pull.
///
/// The window start is always read back from the file length, so a pull
/// interrupted by a crash resumes from the last byte that reached disk.
#[derive(Clone, Debug)]
pub struct PullStorageManager {
    storage_path: PathBuf,
    bundle_id: String,
}

impl PullStorageManager {
    /// Creates a manager, making sure the storage folder exists.
    ///
    /// The bundle id becomes a file name, so it may not be empty, contain a
    /// path separator or be `..`.
    pub fn new(storage_path: &Path, bundle_id: impl Into<String>) -> Result<Self, TransferError> {
        let bundle_id = bundle_id.into();
        if !is_valid_bundle_id(&bundle_id) {
            return Err(TransferError::InvalidBundleId(bundle_id));
        }

        let manager = Self {
            storage_path: storage_path.to_path_buf(),
            bundle_id,
        };

        let folder = manager.storage_folder();
        fs::create_dir_all(&folder).map_err(|e| TransferError::Io(folder, e))?;

        Ok(manager)
    }

    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    /// Returns the folder holding partial bundles.
    pub fn storage_folder(&self) -> PathBuf {
        self.storage_path.join(STORAGE_FOLDER_NAME)
    }

    /// Returns the path of the partial bundle file.
    pub fn bundle_path(&self) -> PathBuf {
        self.storage_folder()
            .join(format!("{}.{}", self.bundle_id, BUNDLE_EXTENSION))
    }

    /// Appends `data` to the end of the partial bundle.
    pub fn append_chunk(&self, data: &[u8]) -> Result<(), TransferError> {
        let path = self.bundle_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| TransferError::Io(path.clone(), e))?;

        file.write_all(data)
            .map_err(|e| TransferError::Io(path.clone(), e))?;

        tracing::debug!(bundle = %self.bundle_id, bytes = data.len(), "appended chunk");
        Ok(())
    }

    /// Overwrites `data` in place starting at `offset`.
    ///
    /// Used to repair a range that is already on disk; the file must exist.
    pub fn write_chunk(&self, offset: u64, data: &[u8]) -> Result<(), TransferError> {
        let path = self.bundle_path();
        let mut file = OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| TransferError::Io(path.clone(), e))?;

        file.seek(SeekFrom::Start(offset))
            .map_err(|e| TransferError::Io(path.clone(), e))?;
        file.write_all(data)
            .map_err(|e| TransferError::Io(path.clone(), e))?;

        tracing::debug!(bundle = %self.bundle_id, offset, bytes = data.len(), "rewrote chunk");
        Ok(())
    }

    /// Offset of the next byte to request: the current length on disk.
    ///
    /// Returns 0 when nothing has been received yet.
    pub fn start_of_window(&self) -> Result<u64, TransferError> {
        let path = self.bundle_path();
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(TransferError::Io(path, e)),
        }
    }

    /// Discards everything received so far, leaving an empty file.
    pub fn reset(&self) -> Result<(), TransferError> {
        let path = self.bundle_path();
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| TransferError::Io(path, e))?;
        Ok(())
    }

    /// Deletes the partial bundle.
    ///
    /// Returns `Ok(true)` if the file was deleted, `Ok(false)` if it didn't exist.
    pub fn remove(&self) -> Result<bool, TransferError> {
        let path = self.bundle_path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(TransferError::Io(path, e)),
        }
    }

    /// Moves a completed bundle to `destination`.
    pub fn promote(&self, destination: &Path) -> Result<(), TransferError> {
        let path = self.bundle_path();
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| TransferError::Io(parent.to_path_buf(), e))?;
        }
        fs::rename(&path, destination).map_err(|e| TransferError::Io(path, e))
    }

    /// Reads the partial bundle back.
    pub fn read(&self) -> Result<Vec<u8>, TransferError> {
        let path = self.bundle_path();
        fs::read(&path).map_err(|e| TransferError::Io(path, e))
    }
}

fn is_valid_bundle_id(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', '\0'])
}
