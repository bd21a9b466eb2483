//! The merge event listener capability and its composing variants.

use super::{ChangeReport, Conflict, MergeLogError};

/// Observes the conflicts and changes a merge produces.
///
/// A merge calls [`entering_context`](Self::entering_context) whenever it
/// descends into a new unit of the document, so that listeners which record
/// events can remember where each one happened.
pub trait MergeEventListener {
    fn conflict_occurred(&mut self, conflict: &mut dyn Conflict) -> Result<(), MergeLogError>;

    fn change_occurred(&mut self, change: &dyn ChangeReport) -> Result<(), MergeLogError>;

    /// `context` is an xpath, line number or anything else that locates the
    /// current unit in the source document.
    fn entering_context(&mut self, context: &str) -> Result<(), MergeLogError>;

    /// Flushes and releases whatever the listener writes to.
    ///
    /// Calling it more than once is harmless.
    fn close(&mut self) -> Result<(), MergeLogError> {
        Ok(())
    }
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMergeEventListener;

impl MergeEventListener for NullMergeEventListener {
    fn conflict_occurred(&mut self, _conflict: &mut dyn Conflict) -> Result<(), MergeLogError> {
        Ok(())
    }

    fn change_occurred(&mut self, _change: &dyn ChangeReport) -> Result<(), MergeLogError> {
        Ok(())
    }

    fn entering_context(&mut self, _context: &str) -> Result<(), MergeLogError> {
        Ok(())
    }
}

/// Forwards every event to each registered listener, in registration order.
///
/// The first listener error stops delivery of that event and is returned to
/// the merge unchanged.
#[derive(Default)]
pub struct DispatchingMergeEventListener {
    listeners: Vec<Box<dyn MergeEventListener>>,
}

impl DispatchingMergeEventListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event_listener(&mut self, listener: Box<dyn MergeEventListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl MergeEventListener for DispatchingMergeEventListener {
    fn conflict_occurred(&mut self, conflict: &mut dyn Conflict) -> Result<(), MergeLogError> {
        for listener in &mut self.listeners {
            listener.conflict_occurred(conflict)?;
        }
        Ok(())
    }

    fn change_occurred(&mut self, change: &dyn ChangeReport) -> Result<(), MergeLogError> {
        for listener in &mut self.listeners {
            listener.change_occurred(change)?;
        }
        Ok(())
    }

    fn entering_context(&mut self, context: &str) -> Result<(), MergeLogError> {
        for listener in &mut self.listeners {
            listener.entering_context(context)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), MergeLogError> {
        for listener in &mut self.listeners {
            listener.close()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{ChangeKind, ConflictKind, ElementChange, ElementConflict};
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        journal: Journal,
        fail: bool,
    }

    impl Recorder {
        fn boxed(name: &'static str, journal: &Journal) -> Box<Self> {
            Box::new(Self {
                name,
                journal: Rc::clone(journal),
                fail: false,
            })
        }

        fn record(&self, event: String) -> Result<(), MergeLogError> {
            self.journal
                .borrow_mut()
                .push(format!("{}:{}", self.name, event));
            if self.fail {
                return Err(MergeLogError::Io(
                    "recorder".into(),
                    io::Error::new(io::ErrorKind::Other, "disk full"),
                ));
            }
            Ok(())
        }
    }

    impl MergeEventListener for Recorder {
        fn conflict_occurred(&mut self, conflict: &mut dyn Conflict) -> Result<(), MergeLogError> {
            self.record(format!("conflict {}", conflict.conflict_type_human_name()))
        }

        fn change_occurred(&mut self, change: &dyn ChangeReport) -> Result<(), MergeLogError> {
            self.record(format!("change {}", change.action_label()))
        }

        fn entering_context(&mut self, context: &str) -> Result<(), MergeLogError> {
            self.record(format!("context {}", context))
        }
    }

    #[test]
    fn test_null_listener_accepts_everything() {
        let mut listener = NullMergeEventListener;
        let mut conflict = ElementConflict::new(ConflictKind::BothEdited, "e", "x", "y", "x");
        listener.entering_context("here").unwrap();
        listener.conflict_occurred(&mut conflict).unwrap();
        listener
            .change_occurred(&ElementChange::new(ChangeKind::Edit, "e"))
            .unwrap();
        listener.close().unwrap();
        assert_eq!(conflict.path_to_unit_of_conflict(), "");
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let journal: Journal = Rc::default();
        let mut dispatcher = DispatchingMergeEventListener::new();
        dispatcher.add_event_listener(Recorder::boxed("first", &journal));
        dispatcher.add_event_listener(Recorder::boxed("second", &journal));
        dispatcher.add_event_listener(Recorder::boxed("third", &journal));

        let mut conflict = ElementConflict::new(ConflictKind::BothAdded, "e", "x", "y", "x");
        dispatcher.entering_context("entry[1]").unwrap();
        dispatcher.conflict_occurred(&mut conflict).unwrap();
        dispatcher
            .change_occurred(&ElementChange::new(ChangeKind::Deletion, "e"))
            .unwrap();

        assert_eq!(
            *journal.borrow(),
            vec![
                "first:context entry[1]",
                "second:context entry[1]",
                "third:context entry[1]",
                "first:conflict Both Added Conflict",
                "second:conflict Both Added Conflict",
                "third:conflict Both Added Conflict",
                "first:change Deleted",
                "second:change Deleted",
                "third:change Deleted",
            ]
        );
    }

    #[test]
    fn test_failure_propagates_and_stops_delivery() {
        let journal: Journal = Rc::default();
        let mut failing = Recorder::boxed("failing", &journal);
        failing.fail = true;

        let mut dispatcher = DispatchingMergeEventListener::new();
        dispatcher.add_event_listener(Recorder::boxed("first", &journal));
        dispatcher.add_event_listener(failing);
        dispatcher.add_event_listener(Recorder::boxed("last", &journal));

        let result = dispatcher.change_occurred(&ElementChange::new(ChangeKind::Edit, "e"));
        assert!(matches!(result, Err(MergeLogError::Io(_, _))));
        assert_eq!(
            *journal.borrow(),
            vec!["first:change Edited", "failing:change Edited"]
        );
    }

    #[test]
    fn test_empty_dispatcher() {
        let mut dispatcher = DispatchingMergeEventListener::new();
        assert!(dispatcher.is_empty());
        dispatcher.entering_context("x").unwrap();
        dispatcher.close().unwrap();
    }
}
