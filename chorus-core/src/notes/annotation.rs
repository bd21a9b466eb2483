//! Annotation and message records read from notes files.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::NotesError;

/// Date format used on message `date` attributes.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Lifecycle state of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationStatus {
    Open,
    Closed,
    Other(String),
}

impl AnnotationStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "open" => AnnotationStatus::Open,
            "closed" => AnnotationStatus::Closed,
            _ => AnnotationStatus::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AnnotationStatus::Open => "open",
            AnnotationStatus::Closed => "closed",
            AnnotationStatus::Other(s) => s,
        }
    }
}

impl fmt::Display for AnnotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in an annotation's discussion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub author: String,
    pub date: Option<DateTime<Utc>>,
    pub guid: Option<String>,
    pub status: Option<String>,
    pub text: String,
}

/// A note, question or conflict attached to a reference in a document.
///
/// Class and status are fixed once parsed; editing happens in the layer
/// that writes notes files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    class_name: String,
    guid: Option<String>,
    status: AnnotationStatus,
    ref_still_escaped: String,
    reference: String,
    messages: Vec<Message>,
}

impl Annotation {
    pub fn new(
        class_name: impl Into<String>,
        status: AnnotationStatus,
        ref_still_escaped: impl Into<String>,
    ) -> Self {
        let ref_still_escaped = ref_still_escaped.into();
        let reference = unescape_ref(&ref_still_escaped);
        Self {
            class_name: class_name.into(),
            guid: None,
            status,
            ref_still_escaped,
            reference,
            messages: Vec::new(),
        }
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }

    pub fn status(&self) -> &AnnotationStatus {
        &self.status
    }

    /// The reference exactly as stored in the file (URL-escaped).
    pub fn ref_still_escaped(&self) -> &str {
        &self.ref_still_escaped
    }

    /// The reference with URL escapes decoded.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_open_conflict(&self) -> bool {
        self.class_name == "conflict" && self.status == AnnotationStatus::Open
    }

    /// Parses a single `<annotation>` record.
    ///
    /// Status comes from the element's `status` attribute when present,
    /// otherwise from the last message that carries one.
    pub fn from_record(record: &[u8]) -> Result<Self, NotesError> {
        let mut reader = Reader::from_reader(record);
        let mut buf = Vec::new();

        let mut annotation: Option<Annotation> = None;
        let mut explicit_status = false;
        let mut current: Option<Message> = None;

        loop {
            buf.clear();
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| NotesError::Parse(e.to_string()))?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let is_empty = matches!(event, Event::Empty(_));
                    match e.name().as_ref() {
                        b"annotation" if annotation.is_none() => {
                            let attrs = read_attributes(e)?;
                            explicit_status = attrs.status.is_some();
                            let mut parsed = Annotation::new(
                                attrs.class.unwrap_or_default(),
                                AnnotationStatus::parse(attrs.status.as_deref().unwrap_or("")),
                                attrs.reference.unwrap_or_default(),
                            );
                            parsed.guid = attrs.guid;
                            annotation = Some(parsed);
                        }
                        b"message" => {
                            let attrs = read_attributes(e)?;
                            let message = Message {
                                author: attrs.author.unwrap_or_default(),
                                date: attrs.date.as_deref().and_then(parse_date),
                                guid: attrs.guid,
                                status: attrs.status,
                                text: String::new(),
                            };
                            if is_empty {
                                push_message(&mut annotation, message)?;
                            } else {
                                current = Some(message);
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(ref t) => {
                    if let Some(message) = current.as_mut() {
                        let text = t.unescape().map_err(|e| NotesError::Parse(e.to_string()))?;
                        message.text.push_str(&text);
                    }
                }
                Event::CData(ref t) => {
                    if let Some(message) = current.as_mut() {
                        message.text.push_str(&String::from_utf8_lossy(t));
                    }
                }
                Event::End(ref e) => {
                    if e.name().as_ref() == b"message" {
                        if let Some(message) = current.take() {
                            push_message(&mut annotation, message)?;
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let mut annotation =
            annotation.ok_or_else(|| NotesError::Parse("record has no annotation".to_string()))?;

        if !explicit_status {
            if let Some(status) = annotation
                .messages
                .iter()
                .rev()
                .find_map(|m| m.status.as_deref())
            {
                annotation.status = AnnotationStatus::parse(status);
            }
        }

        for message in &mut annotation.messages {
            message.text = message.text.trim().to_string();
        }

        Ok(annotation)
    }
}

fn push_message(annotation: &mut Option<Annotation>, message: Message) -> Result<(), NotesError> {
    match annotation.as_mut() {
        Some(a) => {
            a.messages.push(message);
            Ok(())
        }
        None => Err(NotesError::Parse(
            "message found outside an annotation".to_string(),
        )),
    }
}

#[derive(Default)]
struct RecordAttributes {
    class: Option<String>,
    status: Option<String>,
    reference: Option<String>,
    guid: Option<String>,
    author: Option<String>,
    date: Option<String>,
}

fn read_attributes(element: &BytesStart<'_>) -> Result<RecordAttributes, NotesError> {
    let mut attrs = RecordAttributes::default();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| NotesError::Parse(e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| NotesError::Parse(e.to_string()))?
            .into_owned();
        match attr.key.as_ref() {
            b"class" => attrs.class = Some(value),
            b"status" => attrs.status = Some(value),
            b"ref" => attrs.reference = Some(value),
            b"guid" => attrs.guid = Some(value),
            b"author" => attrs.author = Some(value),
            b"date" => attrs.date = Some(value),
            _ => {}
        }
    }
    Ok(attrs)
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, DATE_FORMAT).map(|d| d.and_utc())
        })
        .ok()
}

fn unescape_ref(escaped: &str) -> String {
    urlencoding::decode(escaped)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| escaped.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let record = br#"<annotation class="conflict" status="open" ref="lift://a.lift?id=x%20y" guid="g1">
            <message author="john" date="2009-07-18T23:53:04Z" guid="m1">Both edited &amp; saved</message>
        </annotation>"#;

        let a = Annotation::from_record(record).unwrap();
        assert_eq!(a.class_name(), "conflict");
        assert_eq!(a.status(), &AnnotationStatus::Open);
        assert_eq!(a.ref_still_escaped(), "lift://a.lift?id=x%20y");
        assert_eq!(a.reference(), "lift://a.lift?id=x y");
        assert_eq!(a.guid(), Some("g1"));
        assert!(a.is_open_conflict());

        let m = &a.messages()[0];
        assert_eq!(m.author, "john");
        assert_eq!(m.text, "Both edited & saved");
        assert_eq!(m.guid.as_deref(), Some("m1"));
        assert_eq!(
            m.date.unwrap().format(DATE_FORMAT).to_string(),
            "2009-07-18T23:53:04Z"
        );
    }

    #[test]
    fn test_parse_bare_record() {
        let a = Annotation::from_record(b"<annotation><message/></annotation>").unwrap();
        assert_eq!(a.class_name(), "");
        assert_eq!(a.status(), &AnnotationStatus::Open);
        assert_eq!(a.messages().len(), 1);
        assert_eq!(a.messages()[0], Message::default());
    }

    #[test]
    fn test_status_falls_back_to_last_message() {
        let record = b"<annotation class='question'>\
            <message author='a' status='open'>q</message>\
            <message author='b' status='closed'>done</message>\
            </annotation>";
        let a = Annotation::from_record(record).unwrap();
        assert_eq!(a.status(), &AnnotationStatus::Closed);
        assert_eq!(a.messages().len(), 2);
    }

    #[test]
    fn test_explicit_status_wins() {
        let record = b"<annotation class='conflict' status='open'>\
            <message author='a' status='closed'/></annotation>";
        let a = Annotation::from_record(record).unwrap();
        assert_eq!(a.status(), &AnnotationStatus::Open);
    }

    #[test]
    fn test_record_without_annotation_is_error() {
        let result = Annotation::from_record(b"<message author='x'/>");
        assert!(matches!(result, Err(NotesError::Parse(_))));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(AnnotationStatus::parse("OPEN"), AnnotationStatus::Open);
        assert_eq!(AnnotationStatus::parse("closed"), AnnotationStatus::Closed);
        assert_eq!(
            AnnotationStatus::parse("resolved"),
            AnnotationStatus::Other("resolved".to_string())
        );
        assert_eq!(AnnotationStatus::Closed.to_string(), "closed");
    }
}
