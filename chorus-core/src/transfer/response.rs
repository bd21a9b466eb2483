//! Values exchanged with the remote end of a bundle pull.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome the remote reports for one chunk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PullStatus {
    /// Chunk delivered.
    Ok = 0,
    /// Nothing new since the last pull.
    NoChange = 1,
    /// Unrecoverable on the remote side.
    Fail = 2,
    /// Discard local partial state and start again from offset 0.
    Reset = 3,
    /// The requested bundle does not exist.
    NotAvailable = 4,
}

impl PullStatus {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(PullStatus::Ok),
            1 => Some(PullStatus::NoChange),
            2 => Some(PullStatus::Fail),
            3 => Some(PullStatus::Reset),
            4 => Some(PullStatus::NotAvailable),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for PullStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PullStatus::Ok => "OK",
            PullStatus::NoChange => "NoChange",
            PullStatus::Fail => "Fail",
            PullStatus::Reset => "Reset",
            PullStatus::NotAvailable => "NotAvailable",
        };
        write!(f, "{}", name)
    }
}

/// What the puller asks the remote for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub bundle_id: String,
    /// Window start: the next byte the puller needs.
    pub offset: u64,
    pub chunk_size: u64,
}

/// One round-trip's answer from the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Total size of the whole bundle.
    pub bundle_size: u64,
    /// Lowercase hex SHA-256 of `chunk`; empty when the remote sends none.
    pub checksum: String,
    pub chunk: Vec<u8>,
    pub status: PullStatus,
    pub chunk_size: u64,
}

impl PullResponse {
    /// A response carrying only a status.
    pub fn status_only(status: PullStatus) -> Self {
        Self {
            bundle_size: 0,
            checksum: String::new(),
            chunk: Vec::new(),
            status,
            chunk_size: 0,
        }
    }

    /// An `Ok` response for `chunk` with its checksum filled in.
    pub fn chunk(bundle_size: u64, chunk: Vec<u8>) -> Self {
        Self {
            bundle_size,
            checksum: super::checksum(&chunk),
            chunk_size: chunk.len() as u64,
            chunk,
            status: PullStatus::Ok,
        }
    }
}
