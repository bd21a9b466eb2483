//! Resumable, chunked bundle pulls.
//!
//! A bundle is pulled a chunk at a time into a partial file whose length is
//! the resume point. The transport is the caller's: anything that can answer
//! "give me bytes from offset N" implements [`ChunkSource`].
//!
//! ## Protocol
//!
//! 1. Read the window start (partial file length, 0 when absent)
//! 2. Request a chunk at the window start
//! 3. `OK`: verify the chunk checksum when present, append, repeat until the
//!    window reaches the bundle size
//! 4. `Reset`: truncate the partial file and start again from 0
//! 5. `NoChange` / `Fail` / `NotAvailable`: stop and report the outcome

mod puller;
mod response;
mod storage;

use sha2::{Digest, Sha256};
use std::path::PathBuf;
use thiserror::Error;

pub use puller::{BundlePuller, ChunkSource, PullOptions, PullOutcome};
pub use response::{PullRequest, PullResponse, PullStatus};
pub use storage::{PullStorageManager, STORAGE_FOLDER_NAME};

/// Errors that stop a pull.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("I/O error for {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Chunk at offset {offset} failed checksum verification")]
    ChecksumMismatch { offset: u64 },

    #[error("Received {received} bytes but the bundle is only {bundle_size} bytes")]
    Overrun { received: u64, bundle_size: u64 },

    #[error("Remote sent an empty chunk at offset {offset} of {bundle_size}")]
    Stalled { offset: u64, bundle_size: u64 },

    #[error("Cannot repair {len} bytes at offset {offset}: only {available} bytes on disk")]
    RepairOutOfRange { offset: u64, len: u64, available: u64 },

    #[error("Repair at offset {offset} expected {expected} bytes but received {received}")]
    RepairLength {
        offset: u64,
        expected: u64,
        received: u64,
    },

    #[error("Invalid bundle id {0:?}")]
    InvalidBundleId(String),

    #[error("Remote error: {0}")]
    Remote(String),
}

/// Lowercase hex SHA-256 of `data`, the checksum carried by pull responses.
pub fn checksum(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_known_value() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(checksum(b"a"), checksum(b"b"));
    }
}
