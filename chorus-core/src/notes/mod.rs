//! Notes files and the indexes built over them.
//!
//! A notes file is an XML document of annotations:
//!
//! ```text
//! <notes version='0'>
//!   <annotation class='conflict' status='open' ref='lift://x.lift?id=...'>
//!     <message author='john' date='2009-07-18T23:53:04Z'>text</message>
//!   </annotation>
//! </notes>
//! ```
//!
//! Files are split into records without building a tree, each record is
//! materialized as an [`Annotation`], and indexes are rebuilt on every load.

mod annotation;
mod index;
mod open_conflicts;
mod project;
mod repository;

use std::path::PathBuf;
use thiserror::Error;

pub use annotation::{Annotation, AnnotationStatus, Message, DATE_FORMAT};
pub use index::AnnotationIndex;
pub use open_conflicts::IndexOfAllOpenConflicts;
pub use project::{ListMessage, NotesInProject};
pub use repository::{AnnotationRepository, FILE_EXTENSION};

/// Errors raised while reading notes files.
#[derive(Error, Debug)]
pub enum NotesError {
    #[error("I/O error for {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Malformed annotation record: {0}")]
    Parse(String),

    #[error("Malformed notes file {0}: {1}")]
    File(PathBuf, String),
}
