//! Structured conflict log kept next to the merged document.
//!
//! The log is an XML document rooted at `<conflicts>`:
//!
//! ```text
//! <conflicts>
//!   <conflict type="Both Edited Conflict" guid="..." date="2009-07-18T23:53:04Z" context="entry[@id='x']">description</conflict>
//!   <change type="Added" guid="..." date="..." context="...">description</change>
//! </conflicts>
//! ```
//!
//! The whole document is held in memory and written back on close. Elements
//! recorded since the last [`save`](XmlLogMergeEventListener::save) are lost if
//! the process dies first.

use chrono::Utc;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{ChangeReport, Conflict, MergeEventListener, MergeLogError};

/// Suffix appended to a document path to name its conflict log.
pub const CONFLICT_FILE_SUFFIX: &str = ".conflicts";

/// `date` attribute format: UTC, no offset rendered.
pub const TIME_FORMAT_NO_TIME_ZONE: &str = "%Y-%m-%dT%H:%M:%SZ";

const ROOT: &str = "conflicts";
const EMPTY_LOG: &str = "<conflicts/>";

/// Appends `<conflict>` and `<change>` elements to a conflict log.
pub struct XmlLogMergeEventListener {
    path: PathBuf,
    writer: Option<Writer<Vec<u8>>>,
    /// Location inside the merged document, captured by every event.
    context: String,
}

impl XmlLogMergeEventListener {
    /// Path of the conflict log for `document`.
    pub fn conflict_file_path(document: &Path) -> PathBuf {
        let mut name = document.as_os_str().to_os_string();
        name.push(CONFLICT_FILE_SUFFIX);
        PathBuf::from(name)
    }

    /// Opens the log at `path`, creating an empty one if needed.
    ///
    /// Failing to create the empty log is only logged; loading the log
    /// afterwards reports the real problem.
    pub fn new(path: &Path) -> Result<Self, MergeLogError> {
        if !path.exists() {
            if let Err(e) = fs::write(path, EMPTY_LOG) {
                tracing::warn!(
                    "Could not create blank conflict file {}: {}",
                    path.display(),
                    e
                );
            }
        }

        let existing = fs::read(path).map_err(|e| MergeLogError::Io(path.to_path_buf(), e))?;
        let writer = reopen_under_root(&existing)
            .map_err(|msg| MergeLogError::Malformed(path.to_path_buf(), msg))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(writer),
            context: String::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Writes the log as it stands without closing it.
    pub fn save(&self) -> Result<(), MergeLogError> {
        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| MergeLogError::Closed(self.path.clone()))?;
        let mut bytes = writer.get_ref().clone();
        bytes.extend_from_slice(format!("</{}>", ROOT).as_bytes());
        fs::write(&self.path, bytes).map_err(|e| MergeLogError::Io(self.path.clone(), e))
    }

    fn write_entry(
        &mut self,
        element: &str,
        kind: &str,
        guid: Uuid,
        description: &str,
    ) -> Result<(), MergeLogError> {
        let date = Utc::now().format(TIME_FORMAT_NO_TIME_ZONE).to_string();
        let guid = guid.to_string();

        let mut start = BytesStart::new(element);
        start.push_attribute(("type", kind));
        start.push_attribute(("guid", guid.as_str()));
        start.push_attribute(("date", date.as_str()));
        start.push_attribute(("context", self.context.as_str()));

        let path = &self.path;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| MergeLogError::Closed(path.clone()))?;
        let to_error = |e| write_error(path, e);

        writer.write_event(Event::Start(start)).map_err(to_error)?;
        writer
            .write_event(Event::Text(BytesText::new(description)))
            .map_err(to_error)?;
        writer
            .write_event(Event::End(BytesEnd::new(element)))
            .map_err(to_error)?;
        Ok(())
    }
}

impl MergeEventListener for XmlLogMergeEventListener {
    fn conflict_occurred(&mut self, conflict: &mut dyn Conflict) -> Result<(), MergeLogError> {
        let description = conflict.full_human_readable_description();
        self.write_entry(
            "conflict",
            &conflict.conflict_type_human_name(),
            conflict.guid(),
            &description,
        )?;
        conflict.set_path_to_unit_of_conflict(self.context.clone());
        Ok(())
    }

    fn change_occurred(&mut self, change: &dyn ChangeReport) -> Result<(), MergeLogError> {
        // Changes are not told their context.
        self.write_entry(
            "change",
            &change.action_label(),
            change.guid(),
            &change.full_human_readable_description(),
        )
    }

    fn entering_context(&mut self, context: &str) -> Result<(), MergeLogError> {
        self.context = context.to_string();
        Ok(())
    }

    fn close(&mut self) -> Result<(), MergeLogError> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        writer
            .write_event(Event::End(BytesEnd::new(ROOT)))
            .map_err(|e| write_error(&self.path, e))?;
        fs::write(&self.path, writer.into_inner())
            .map_err(|e| MergeLogError::Io(self.path.clone(), e))
    }
}

impl fmt::Debug for XmlLogMergeEventListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlLogMergeEventListener")
            .field("path", &self.path)
            .field("open", &self.writer.is_some())
            .field("context", &self.context)
            .finish()
    }
}

impl Drop for XmlLogMergeEventListener {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to save conflict log: {}", e);
        }
    }
}

fn write_error<E>(path: &Path, e: E) -> MergeLogError
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    MergeLogError::Io(path.to_path_buf(), io::Error::other(e))
}

/// Copies an existing log into a writer positioned after the root's last child.
fn reopen_under_root(existing: &[u8]) -> Result<Writer<Vec<u8>>, String> {
    let mut reader = Reader::from_reader(existing);
    let mut writer = Writer::new(Vec::new());
    let mut buf = Vec::new();
    let mut depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| e.to_string())?;
        match event {
            Event::Start(e) => {
                if depth == 0 && e.name().as_ref() != ROOT.as_bytes() {
                    return Err(format!("root element is not <{}>", ROOT));
                }
                depth += 1;
                writer
                    .write_event(Event::Start(e))
                    .map_err(|e| e.to_string())?;
            }
            Event::Empty(e) if depth == 0 => {
                if e.name().as_ref() != ROOT.as_bytes() {
                    return Err(format!("root element is not <{}>", ROOT));
                }
                writer
                    .write_event(Event::Start(e))
                    .map_err(|e| e.to_string())?;
                return Ok(writer);
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(writer);
                }
                writer
                    .write_event(Event::End(e))
                    .map_err(|e| e.to_string())?;
            }
            Event::Eof => return Err(format!("no <{}> root element", ROOT)),
            other => writer.write_event(other).map_err(|e| e.to_string())?,
        }
        buf.clear();
    }
}

/// One recorded element of a conflict log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictLogEntry {
    /// `conflict` or `change`.
    pub element: String,
    pub kind: String,
    pub guid: String,
    pub date: String,
    pub context: String,
    pub description: String,
}

/// Reads back every entry of a conflict log, in file order.
pub fn read_conflict_log(path: &Path) -> Result<Vec<ConflictLogEntry>, MergeLogError> {
    let bytes = fs::read(path).map_err(|e| MergeLogError::Io(path.to_path_buf(), e))?;
    let malformed = |msg: String| MergeLogError::Malformed(path.to_path_buf(), msg);

    let mut reader = Reader::from_reader(bytes.as_slice());
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    let mut current: Option<ConflictLogEntry> = None;

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| malformed(e.to_string()))?
        {
            Event::Start(e) if is_entry(e.name().as_ref()) => {
                current = Some(read_entry(&e).map_err(malformed)?);
            }
            Event::Empty(e) if is_entry(e.name().as_ref()) => {
                entries.push(read_entry(&e).map_err(malformed)?);
            }
            Event::Text(t) => {
                if let Some(entry) = current.as_mut() {
                    let text = t.unescape().map_err(|e| malformed(e.to_string()))?;
                    entry.description.push_str(&text);
                }
            }
            Event::End(e) if is_entry(e.name().as_ref()) => {
                if let Some(entry) = current.take() {
                    entries.push(entry);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

fn is_entry(name: &[u8]) -> bool {
    matches!(name, b"conflict" | b"change")
}

fn read_entry(e: &BytesStart<'_>) -> Result<ConflictLogEntry, String> {
    let mut entry = ConflictLogEntry {
        element: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        kind: String::new(),
        guid: String::new(),
        date: String::new(),
        context: String::new(),
        description: String::new(),
    };
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let value = attr
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();
        match attr.key.as_ref() {
            b"type" => entry.kind = value,
            b"guid" => entry.guid = value,
            b"date" => entry.date = value,
            b"context" => entry.context = value,
            _ => {}
        }
    }
    Ok(entry)
}
