//! Caller-side pull loop driving a [`PullStorageManager`].

use std::path::PathBuf;

use super::{checksum, PullRequest, PullResponse, PullStatus, PullStorageManager, TransferError};
use crate::progress::ProgressSink;

/// Fetches chunks from wherever the bundle lives.
pub trait ChunkSource {
    fn pull_chunk(&mut self, request: &PullRequest) -> Result<PullResponse, TransferError>;
}

impl<F> ChunkSource for F
where
    F: FnMut(&PullRequest) -> Result<PullResponse, TransferError>,
{
    fn pull_chunk(&mut self, request: &PullRequest) -> Result<PullResponse, TransferError> {
        self(request)
    }
}

/// Tuning for [`BundlePuller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullOptions {
    /// Bytes requested per round-trip.
    pub chunk_size: u64,
    /// `Reset` instructions honored before the pull is abandoned.
    pub max_resets: u32,
    /// Consecutive checksum failures tolerated for one chunk.
    pub max_chunk_retries: u32,
}

impl Default for PullOptions {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            max_resets: 3,
            max_chunk_retries: 3,
        }
    }
}

/// How a pull ended, when it ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Every byte is on disk at `path`.
    Complete { path: PathBuf, bundle_size: u64 },
    /// The remote has nothing new.
    NoChange,
    /// The remote failed, or kept asking for resets.
    Failed,
    /// The remote has no such bundle.
    NotAvailable,
}

/// Pulls one bundle into local storage, resuming from whatever is on disk.
#[derive(Debug)]
pub struct BundlePuller {
    storage: PullStorageManager,
    options: PullOptions,
}

impl BundlePuller {
    pub fn new(storage: PullStorageManager, options: PullOptions) -> Self {
        Self { storage, options }
    }

    pub fn storage(&self) -> &PullStorageManager {
        &self.storage
    }

    pub fn options(&self) -> &PullOptions {
        &self.options
    }

    /// Runs the pull to a terminal outcome.
    ///
    /// I/O and transport errors are returned as-is; retry policy beyond
    /// checksum failures and resets belongs to the caller.
    pub fn pull(
        &mut self,
        source: &mut dyn ChunkSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<PullOutcome, TransferError> {
        let bundle_id = self.storage.bundle_id().to_string();
        let mut resets = 0;
        let mut retries = 0;

        loop {
            let offset = self.storage.start_of_window()?;
            let request = PullRequest {
                bundle_id: bundle_id.clone(),
                offset,
                chunk_size: self.options.chunk_size,
            };
            let response = source.pull_chunk(&request)?;

            match response.status {
                PullStatus::Ok => {
                    if !verify(&response) {
                        retries += 1;
                        tracing::warn!(bundle = %bundle_id, offset, retries, "chunk checksum mismatch");
                        if retries > self.options.max_chunk_retries {
                            return Err(TransferError::ChecksumMismatch { offset });
                        }
                        continue;
                    }
                    retries = 0;

                    let received = offset + response.chunk.len() as u64;
                    if received > response.bundle_size {
                        return Err(TransferError::Overrun {
                            received,
                            bundle_size: response.bundle_size,
                        });
                    }
                    if response.chunk.is_empty() && received < response.bundle_size {
                        return Err(TransferError::Stalled {
                            offset,
                            bundle_size: response.bundle_size,
                        });
                    }

                    // An empty append still creates the file for a zero-length bundle.
                    self.storage.append_chunk(&response.chunk)?;
                    progress.report_step(received as usize, response.bundle_size as usize);

                    if received == response.bundle_size {
                        tracing::info!(bundle = %bundle_id, bytes = received, "bundle pull complete");
                        return Ok(PullOutcome::Complete {
                            path: self.storage.bundle_path(),
                            bundle_size: received,
                        });
                    }
                }
                PullStatus::Reset => {
                    resets += 1;
                    if resets > self.options.max_resets {
                        tracing::warn!(bundle = %bundle_id, resets, "too many resets, giving up");
                        self.storage.remove()?;
                        return Ok(PullOutcome::Failed);
                    }
                    tracing::debug!(bundle = %bundle_id, "remote requested reset");
                    progress.report_message("Restarting pull from the beginning");
                    self.storage.reset()?;
                }
                PullStatus::NoChange => {
                    self.storage.remove()?;
                    return Ok(PullOutcome::NoChange);
                }
                PullStatus::Fail => {
                    self.storage.remove()?;
                    return Ok(PullOutcome::Failed);
                }
                PullStatus::NotAvailable => {
                    self.storage.remove()?;
                    return Ok(PullOutcome::NotAvailable);
                }
            }
        }
    }

    /// Refetches `len` bytes at `offset` and overwrites them in place.
    ///
    /// The range must already be on disk and the remote must return all of
    /// it; nothing is written otherwise. The window start does not move.
    pub fn repair(
        &mut self,
        source: &mut dyn ChunkSource,
        offset: u64,
        len: u64,
    ) -> Result<(), TransferError> {
        let available = self.storage.start_of_window()?;
        if offset.saturating_add(len) > available {
            return Err(TransferError::RepairOutOfRange {
                offset,
                len,
                available,
            });
        }

        let request = PullRequest {
            bundle_id: self.storage.bundle_id().to_string(),
            offset,
            chunk_size: len,
        };
        let response = source.pull_chunk(&request)?;

        match response.status {
            PullStatus::Ok if verify(&response) => {
                let received = response.chunk.len() as u64;
                if received != len {
                    return Err(TransferError::RepairLength {
                        offset,
                        expected: len,
                        received,
                    });
                }
                self.storage.write_chunk(offset, &response.chunk)
            }
            PullStatus::Ok => Err(TransferError::ChecksumMismatch { offset }),
            status => Err(TransferError::Remote(format!(
                "repair at offset {} answered with {}",
                offset, status
            ))),
        }
    }
}

fn verify(response: &PullResponse) -> bool {
    response.checksum.is_empty() || checksum(&response.chunk) == response.checksum
}
