//! Conflict and change payloads announced by a merge.

use std::fmt;
use uuid::Uuid;

/// A conflict the merge could not resolve without picking a winner.
pub trait Conflict {
    fn conflict_type_human_name(&self) -> String;

    fn guid(&self) -> Uuid;

    /// Where in the source document the conflict happened.
    ///
    /// Set by whichever listener records the conflict, not by the producer.
    fn path_to_unit_of_conflict(&self) -> &str;

    fn set_path_to_unit_of_conflict(&mut self, path: String);

    fn full_human_readable_description(&self) -> String;
}

/// A change the merge applied.
pub trait ChangeReport: fmt::Display {
    fn action_label(&self) -> String;

    fn guid(&self) -> Uuid;

    fn full_human_readable_description(&self) -> String;
}

/// The situations an element-level merge can end up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    BothEdited,
    BothAdded,
    RemovedVsEdited,
    EditedVsRemoved,
    AmbiguousInsert,
}

impl ConflictKind {
    pub fn human_name(&self) -> &'static str {
        match self {
            ConflictKind::BothEdited => "Both Edited Conflict",
            ConflictKind::BothAdded => "Both Added Conflict",
            ConflictKind::RemovedVsEdited => "Removed Vs Edited Element Conflict",
            ConflictKind::EditedVsRemoved => "Edited Vs Removed Element Conflict",
            ConflictKind::AmbiguousInsert => "Ambiguous Insert Conflict",
        }
    }
}

/// A conflict on one element between the two sides of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementConflict {
    kind: ConflictKind,
    guid: Uuid,
    element_name: String,
    user_x: String,
    user_y: String,
    winner: String,
    path_to_unit_of_conflict: String,
}

impl ElementConflict {
    /// `winner` is the user whose version was kept.
    pub fn new(
        kind: ConflictKind,
        element_name: impl Into<String>,
        user_x: impl Into<String>,
        user_y: impl Into<String>,
        winner: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            guid: Uuid::new_v4(),
            element_name: element_name.into(),
            user_x: user_x.into(),
            user_y: user_y.into(),
            winner: winner.into(),
            path_to_unit_of_conflict: String::new(),
        }
    }

    pub fn kind(&self) -> ConflictKind {
        self.kind
    }

    fn situation(&self) -> String {
        let (x, y, e) = (&self.user_x, &self.user_y, &self.element_name);
        match self.kind {
            ConflictKind::BothEdited => format!("{} and {} edited the same part of '{}'", x, y, e),
            ConflictKind::BothAdded => format!("{} and {} both added '{}'", x, y, e),
            ConflictKind::RemovedVsEdited => {
                format!("{} deleted '{}', while {} edited it", x, e, y)
            }
            ConflictKind::EditedVsRemoved => {
                format!("{} edited '{}', while {} deleted it", x, e, y)
            }
            ConflictKind::AmbiguousInsert => format!(
                "{} and {} inserted material in '{}' at the same place",
                x, y, e
            ),
        }
    }
}

impl Conflict for ElementConflict {
    fn conflict_type_human_name(&self) -> String {
        self.kind.human_name().to_string()
    }

    fn guid(&self) -> Uuid {
        self.guid
    }

    fn path_to_unit_of_conflict(&self) -> &str {
        &self.path_to_unit_of_conflict
    }

    fn set_path_to_unit_of_conflict(&mut self, path: String) {
        self.path_to_unit_of_conflict = path;
    }

    fn full_human_readable_description(&self) -> String {
        format!(
            "{}: {}. The automated merger kept the change made by {}.",
            self.conflict_type_human_name(),
            self.situation(),
            self.winner
        )
    }
}

/// What happened to an element during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Addition,
    Deletion,
    Edit,
}

impl ChangeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChangeKind::Addition => "Added",
            ChangeKind::Deletion => "Deleted",
            ChangeKind::Edit => "Edited",
        }
    }
}

/// A change to one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementChange {
    kind: ChangeKind,
    guid: Uuid,
    element_name: String,
    detail: String,
}

impl ElementChange {
    pub fn new(kind: ChangeKind, element_name: impl Into<String>) -> Self {
        Self {
            kind,
            guid: Uuid::new_v4(),
            element_name: element_name.into(),
            detail: String::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }
}

impl ChangeReport for ElementChange {
    fn action_label(&self) -> String {
        self.kind.label().to_string()
    }

    fn guid(&self) -> Uuid {
        self.guid
    }

    fn full_human_readable_description(&self) -> String {
        if self.detail.is_empty() {
            format!("{} {}", self.kind.label(), self.element_name)
        } else {
            format!("{} {}: {}", self.kind.label(), self.element_name, self.detail)
        }
    }
}

impl fmt::Display for ElementChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.label(), self.element_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_description_names_both_users() {
        let c = ElementConflict::new(ConflictKind::BothEdited, "gloss", "john", "bob", "john");
        let text = c.full_human_readable_description();
        assert!(text.starts_with("Both Edited Conflict:"));
        assert!(text.contains("john and bob edited"));
        assert!(text.ends_with("kept the change made by john."));
    }

    #[test]
    fn test_conflict_path_starts_empty() {
        let mut c = ElementConflict::new(ConflictKind::BothAdded, "sense", "a", "b", "a");
        assert_eq!(c.path_to_unit_of_conflict(), "");
        c.set_path_to_unit_of_conflict("entry[@id='x']".to_string());
        assert_eq!(c.path_to_unit_of_conflict(), "entry[@id='x']");
    }

    #[test]
    fn test_each_conflict_gets_its_own_guid() {
        let a = ElementConflict::new(ConflictKind::BothEdited, "e", "x", "y", "x");
        let b = ElementConflict::new(ConflictKind::BothEdited, "e", "x", "y", "x");
        assert_ne!(Conflict::guid(&a), Conflict::guid(&b));
    }

    #[test]
    fn test_change_string_forms() {
        let c = ElementChange::new(ChangeKind::Addition, "sense").with_detail("gloss 'dog'");
        assert_eq!(c.action_label(), "Added");
        assert_eq!(c.to_string(), "Added sense");
        assert_eq!(c.full_human_readable_description(), "Added sense: gloss 'dog'");
    }
}
