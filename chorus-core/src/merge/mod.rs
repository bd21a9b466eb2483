//! Merge event bus and the logs it feeds.
//!
//! A merge announces where it is with `entering_context` and reports each
//! conflict and change to a [`MergeEventListener`]. Listeners compose through
//! [`DispatchingMergeEventListener`], so one merge can feed both the
//! human-readable log and the structured conflict log:
//!
//! ```ignore
//! let mut bus = DispatchingMergeEventListener::new();
//! bus.add_event_listener(Box::new(HumanLogMergeEventListener::new(&log_path)?));
//! bus.add_event_listener(Box::new(XmlLogMergeEventListener::new(
//!     &XmlLogMergeEventListener::conflict_file_path(&document),
//! )?));
//!
//! bus.entering_context("entry[@id='x']")?;
//! bus.conflict_occurred(&mut conflict)?;
//! bus.close()?;
//! ```

mod conflict;
mod human_log;
mod listener;
mod xml_log;

use std::path::PathBuf;
use thiserror::Error;

pub use conflict::{ChangeKind, ChangeReport, Conflict, ConflictKind, ElementChange, ElementConflict};
pub use human_log::HumanLogMergeEventListener;
pub use listener::{DispatchingMergeEventListener, MergeEventListener, NullMergeEventListener};
pub use xml_log::{
    read_conflict_log, ConflictLogEntry, XmlLogMergeEventListener, CONFLICT_FILE_SUFFIX,
    TIME_FORMAT_NO_TIME_ZONE,
};

/// Errors raised while recording merge events.
#[derive(Error, Debug)]
pub enum MergeLogError {
    #[error("I/O error for {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Malformed conflict log {0}: {1}")]
    Malformed(PathBuf, String),

    #[error("Conflict log {0} is already closed")]
    Closed(PathBuf),
}
