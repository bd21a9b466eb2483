//! Loading a single notes file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Annotation, IndexOfAllOpenConflicts, NotesError};
use crate::element_reader::ElementReader;
use crate::progress::ProgressSink;

/// File extension for notes files.
pub const FILE_EXTENSION: &str = "ChorusNotes";

const RECORD_MARKER: &str = "<annotation";
const CLOSING_TAG: &str = "</notes>";

/// The annotations of one notes file together with their indexes.
#[derive(Debug)]
pub struct AnnotationRepository {
    path: Option<PathBuf>,
    annotations: Vec<Arc<Annotation>>,
    open_conflicts: IndexOfAllOpenConflicts,
}

impl AnnotationRepository {
    /// Path of the notes file that annotates `document`.
    pub fn path_for_document(document: &Path) -> PathBuf {
        let mut name = document.as_os_str().to_os_string();
        name.push(".");
        name.push(FILE_EXTENSION);
        PathBuf::from(name)
    }

    /// Loads a notes file from disk.
    pub fn from_file(path: &Path, progress: &mut dyn ProgressSink) -> Result<Self, NotesError> {
        let bytes = fs::read(path).map_err(|e| NotesError::Io(path.to_path_buf(), e))?;
        let mut repo = Self::from_bytes(&bytes, progress)
            .map_err(|e| NotesError::File(path.to_path_buf(), e.to_string()))?;
        repo.path = Some(path.to_path_buf());
        Ok(repo)
    }

    /// Builds a repository from the raw bytes of a notes document.
    pub fn from_bytes(bytes: &[u8], progress: &mut dyn ProgressSink) -> Result<Self, NotesError> {
        let bytes = bytes.trim_ascii_end();
        if !bytes.ends_with(CLOSING_TAG.as_bytes()) {
            if is_empty_root(bytes) {
                return Ok(Self::from_annotations(Vec::new(), progress));
            }
            return Err(NotesError::Parse(format!(
                "document does not end with {}",
                CLOSING_TAG
            )));
        }

        let reader = ElementReader::new(RECORD_MARKER, CLOSING_TAG).with_terminators(b">/");

        let mut annotations = Vec::new();
        let mut failure = None;
        reader.run(bytes, |record| {
            if failure.is_some() {
                return;
            }
            match Annotation::from_record(record) {
                Ok(a) => annotations.push(Arc::new(a)),
                Err(e) => failure = Some(e),
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }

        tracing::debug!(count = annotations.len(), "loaded annotations");
        Ok(Self::from_annotations(annotations, progress))
    }

    pub fn from_annotations(
        annotations: Vec<Arc<Annotation>>,
        progress: &mut dyn ProgressSink,
    ) -> Self {
        let mut open_conflicts = IndexOfAllOpenConflicts::new();
        open_conflicts.initialize(annotations.iter().cloned(), progress);
        Self {
            path: None,
            annotations,
            open_conflicts,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn annotations(&self) -> &[Arc<Annotation>] {
        &self.annotations
    }

    pub fn open_conflicts(&self) -> &IndexOfAllOpenConflicts {
        &self.open_conflicts
    }
}

/// True for an empty buffer or a document that is just `<notes .../>`.
fn is_empty_root(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return true;
    }
    match bytes.iter().rposition(|b| *b == b'<') {
        Some(pos) => bytes[pos..].starts_with(b"<notes") && bytes.ends_with(b"/>"),
        None => false,
    }
}
