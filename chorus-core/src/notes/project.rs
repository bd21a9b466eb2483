//! All notes files of a project folder, queried as one message list.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Annotation, AnnotationRepository, Message, NotesError, FILE_EXTENSION};
use crate::progress::ProgressSink;

/// One message together with the annotation it belongs to.
#[derive(Debug, Clone)]
pub struct ListMessage {
    pub annotation: Arc<Annotation>,
    pub message: Message,
    /// Notes file the annotation was read from.
    pub source: Option<PathBuf>,
}

impl ListMessage {
    fn matches(&self, needle: &str) -> bool {
        let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
        contains(self.annotation.class_name())
            || contains(self.annotation.reference())
            || contains(&self.message.author)
            || contains(&self.message.text)
    }
}

/// Every notes repository found beneath a project folder.
#[derive(Debug)]
pub struct NotesInProject {
    root: PathBuf,
    repositories: Vec<AnnotationRepository>,
}

impl NotesInProject {
    /// Loads every `*.ChorusNotes` file under `root`, recursing into subfolders.
    pub fn load(root: &Path, progress: &mut dyn ProgressSink) -> Result<Self, NotesError> {
        let mut files = Vec::new();
        collect_notes_files(root, &mut files)?;
        files.sort();

        let total = files.len();
        let mut repositories = Vec::with_capacity(total);
        for (done, path) in files.iter().enumerate() {
            progress.report_message(&format!("Reading {}", path.display()));
            repositories.push(AnnotationRepository::from_file(path, progress)?);
            progress.report_step(done + 1, total);
        }

        tracing::debug!(root = %root.display(), files = total, "loaded project notes");
        Ok(Self {
            root: root.to_path_buf(),
            repositories,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repositories(&self) -> &[AnnotationRepository] {
        &self.repositories
    }

    /// Messages across all repositories, filtered by `search`.
    ///
    /// An empty search returns every message. Otherwise a message is kept
    /// when the annotation class, its reference, the author or the text
    /// contains the search text, ignoring case.
    pub fn messages(&self, search: &str) -> Vec<ListMessage> {
        let needle = search.trim().to_lowercase();
        self.repositories
            .iter()
            .flat_map(|repo| {
                repo.annotations().iter().flat_map(move |annotation| {
                    annotation.messages().iter().map(move |message| ListMessage {
                        annotation: Arc::clone(annotation),
                        message: message.clone(),
                        source: repo.path().map(Path::to_path_buf),
                    })
                })
            })
            .filter(|m| needle.is_empty() || m.matches(&needle))
            .collect()
    }

    /// Open conflicts whose reference contains `search`, across all files.
    pub fn open_conflicts_where_reference_contains(
        &self,
        search: &str,
        progress: &mut dyn ProgressSink,
    ) -> Vec<Arc<Annotation>> {
        self.repositories
            .iter()
            .flat_map(|repo| {
                repo.open_conflicts()
                    .get_conflicts_where_reference_contains(search, progress)
            })
            .collect()
    }

    /// Open conflicts with exactly this escaped reference, across all files.
    pub fn open_conflicts_with_exact_reference(&self, reference: &str) -> Vec<Arc<Annotation>> {
        self.repositories
            .iter()
            .flat_map(|repo| {
                repo.open_conflicts()
                    .get_conflicts_with_exact_reference(reference)
            })
            .collect()
    }
}

fn collect_notes_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), NotesError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(NotesError::Io(dir.to_path_buf(), e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| NotesError::Io(dir.to_path_buf(), e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| NotesError::Io(path.clone(), e))?;

        if file_type.is_dir() {
            collect_notes_files(&path, files)?;
        } else if path.extension().and_then(|s| s.to_str()) == Some(FILE_EXTENSION) {
            files.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use tempfile::TempDir;

    fn write_notes(dir: &Path, name: &str, contents: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(format!("{}.{}", name, FILE_EXTENSION)),
            format!("<notes version='0'>{}</notes>", contents),
        )
        .unwrap();
    }

    #[test]
    fn test_no_notes_files() {
        let temp = TempDir::new().unwrap();
        let notes = NotesInProject::load(temp.path(), &mut NullProgress).unwrap();
        assert_eq!(notes.messages("").len(), 0);
    }

    #[test]
    fn test_files_in_sub_dirs_gets_them_all() {
        let temp = TempDir::new().unwrap();
        write_notes(temp.path(), "one", "<annotation><message/></annotation>");
        write_notes(
            &temp.path().join("Sub"),
            "two",
            "<annotation><message/></annotation>",
        );
        fs::write(temp.path().join("other.txt"), "<annotation/>").unwrap();

        let notes = NotesInProject::load(temp.path(), &mut NullProgress).unwrap();
        assert_eq!(notes.repositories().len(), 2);
        assert_eq!(notes.messages("").len(), 2);
    }

    #[test]
    fn test_search_contains_author_finds_matches() {
        let temp = TempDir::new().unwrap();
        write_notes(
            temp.path(),
            "one",
            "<annotation><message author='john'></message></annotation>",
        );

        let notes = NotesInProject::load(temp.path(), &mut NullProgress).unwrap();
        assert_eq!(notes.messages("john").len(), 1);
    }

    #[test]
    fn test_search_contains_class_finds_matches() {
        let temp = TempDir::new().unwrap();
        write_notes(
            temp.path(),
            "one",
            "<annotation class='question'><message author='john'></message></annotation>\n\
             <annotation class='note'><message author='bob'></message></annotation>",
        );

        let notes = NotesInProject::load(temp.path(), &mut NullProgress).unwrap();
        assert_eq!(notes.messages("").len(), 2);

        let found = notes.messages("ques");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message.author, "john");
    }

    #[test]
    fn test_search_ignores_case_and_matches_text() {
        let temp = TempDir::new().unwrap();
        write_notes(
            temp.path(),
            "one",
            "<annotation class='note'><message author='amy'>Check the Gloss</message></annotation>",
        );

        let notes = NotesInProject::load(temp.path(), &mut NullProgress).unwrap();
        assert_eq!(notes.messages("gloss").len(), 1);
        assert_eq!(notes.messages("AMY").len(), 1);
        assert!(notes.messages("bob").is_empty());
    }

    #[test]
    fn test_open_conflicts_across_files() {
        let temp = TempDir::new().unwrap();
        write_notes(
            temp.path(),
            "one",
            "<annotation class='conflict' status='open' ref='lift://a.lift?id=1'><message/></annotation>",
        );
        write_notes(
            &temp.path().join("Sub"),
            "two",
            "<annotation class='conflict' status='open' ref='lift://b.lift?id=2'><message/></annotation>\
             <annotation class='conflict' status='closed' ref='lift://b.lift?id=3'><message/></annotation>",
        );

        let notes = NotesInProject::load(temp.path(), &mut NullProgress).unwrap();
        let found = notes.open_conflicts_where_reference_contains("lift://", &mut NullProgress);
        assert_eq!(found.len(), 2);
        assert_eq!(
            notes
                .open_conflicts_with_exact_reference("lift://b.lift?id=2")
                .len(),
            1
        );
    }

    #[test]
    fn test_source_path_recorded() {
        let temp = TempDir::new().unwrap();
        write_notes(temp.path(), "one", "<annotation><message author='x'/></annotation>");

        let notes = NotesInProject::load(temp.path(), &mut NullProgress).unwrap();
        let messages = notes.messages("");
        assert_eq!(
            messages[0].source.as_deref(),
            Some(temp.path().join("one.ChorusNotes").as_path())
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_not_followed() {
        let temp = TempDir::new().unwrap();
        write_notes(temp.path(), "one", "<annotation><message/></annotation>");
        std::os::unix::fs::symlink(temp.path(), temp.path().join("loop")).unwrap();

        let notes = NotesInProject::load(temp.path(), &mut NullProgress).unwrap();
        assert_eq!(notes.repositories().len(), 1);
        assert_eq!(notes.messages("").len(), 1);
    }
}
