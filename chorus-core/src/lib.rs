//! Chorus Core Library
//!
//! Synchronization and conflict-tracking core shared by Chorus front ends:
//! resumable bundle pulls, merge event logging, and notes indexing.

pub mod element_reader;
pub mod merge;
pub mod notes;
pub mod progress;
pub mod transfer;

pub use element_reader::ElementReader;
pub use merge::{
    ChangeKind, ChangeReport, Conflict, ConflictKind, DispatchingMergeEventListener,
    ElementChange, ElementConflict, HumanLogMergeEventListener, MergeEventListener,
    MergeLogError, NullMergeEventListener, XmlLogMergeEventListener,
};
pub use notes::{
    Annotation, AnnotationIndex, AnnotationRepository, AnnotationStatus, IndexOfAllOpenConflicts,
    ListMessage, Message, NotesError, NotesInProject,
};
pub use progress::{NullProgress, ProgressSink, TracingProgress};
pub use transfer::{
    BundlePuller, ChunkSource, PullOptions, PullOutcome, PullRequest, PullResponse, PullStatus,
    PullStorageManager, TransferError,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
