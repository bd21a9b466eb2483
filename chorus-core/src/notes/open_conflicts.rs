use std::sync::Arc;

use super::{Annotation, AnnotationIndex};
use crate::progress::ProgressSink;

/// Index of every open conflict, keyed by its still-escaped reference.
#[derive(Debug)]
pub struct IndexOfAllOpenConflicts {
    index: AnnotationIndex,
}

impl IndexOfAllOpenConflicts {
    pub fn new() -> Self {
        Self {
            index: AnnotationIndex::new(
                "open conflicts",
                Annotation::is_open_conflict,
                |a: &Annotation| a.ref_still_escaped().to_string(),
            ),
        }
    }

    pub fn initialize<I>(&mut self, annotations: I, progress: &mut dyn ProgressSink)
    where
        I: IntoIterator<Item = Arc<Annotation>>,
    {
        self.index.initialize(annotations, progress);
    }

    pub fn get_conflicts_with_exact_reference(&self, reference: &str) -> Vec<Arc<Annotation>> {
        self.index.get_matches_by_key(reference)
    }

    pub fn get_conflicts_where_reference_contains(
        &self,
        search: &str,
        progress: &mut dyn ProgressSink,
    ) -> Vec<Arc<Annotation>> {
        self.index
            .get_matches(|reference| reference.contains(search), progress)
    }

    /// The underlying generic index.
    pub fn index(&self) -> &AnnotationIndex {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut AnnotationIndex {
        &mut self.index
    }
}

impl Default for IndexOfAllOpenConflicts {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::AnnotationStatus;
    use crate::progress::NullProgress;

    fn build() -> IndexOfAllOpenConflicts {
        let annotations = vec![
            Annotation::new("conflict", AnnotationStatus::Open, "lift://a.lift?id=one"),
            Annotation::new("conflict", AnnotationStatus::Open, "lift://a.lift?id=two%20x"),
            Annotation::new("conflict", AnnotationStatus::Closed, "lift://a.lift?id=three"),
            Annotation::new("question", AnnotationStatus::Open, "lift://a.lift?id=four"),
        ];
        let mut index = IndexOfAllOpenConflicts::new();
        index.initialize(annotations.into_iter().map(Arc::new), &mut NullProgress);
        index
    }

    #[test]
    fn test_only_open_conflicts_indexed() {
        let index = build();
        assert_eq!(index.index().len(), 2);
        assert!(index
            .get_conflicts_with_exact_reference("lift://a.lift?id=three")
            .is_empty());
        assert!(index
            .get_conflicts_with_exact_reference("lift://a.lift?id=four")
            .is_empty());
    }

    #[test]
    fn test_exact_reference_uses_escaped_form() {
        let index = build();
        assert_eq!(
            index
                .get_conflicts_with_exact_reference("lift://a.lift?id=two%20x")
                .len(),
            1
        );
        assert!(index
            .get_conflicts_with_exact_reference("lift://a.lift?id=two x")
            .is_empty());
    }

    #[test]
    fn test_reference_contains() {
        let index = build();
        let found = index.get_conflicts_where_reference_contains("id=t", &mut NullProgress);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].reference(), "lift://a.lift?id=two x");

        let all = index.get_conflicts_where_reference_contains("", &mut NullProgress);
        assert_eq!(all.len(), 2);
    }
}
