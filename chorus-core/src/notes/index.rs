//! Generic key index over annotations.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::Annotation;
use crate::progress::ProgressSink;

type IncludePredicate = Box<dyn Fn(&Annotation) -> bool + Send + Sync>;
type KeyFunction = Box<dyn Fn(&Annotation) -> String + Send + Sync>;

/// Maps a derived key to the annotations that satisfy an inclusion predicate.
///
/// Both the predicate and the key function are fixed when the index is
/// constructed; specialized indexes such as
/// [`IndexOfAllOpenConflicts`](super::IndexOfAllOpenConflicts) wrap this type
/// and supply their own policy.
pub struct AnnotationIndex {
    name: String,
    include: IncludePredicate,
    key_of: KeyFunction,
    by_key: BTreeMap<String, Vec<Arc<Annotation>>>,
}

impl AnnotationIndex {
    pub fn new<P, K>(name: impl Into<String>, include: P, key_of: K) -> Self
    where
        P: Fn(&Annotation) -> bool + Send + Sync + 'static,
        K: Fn(&Annotation) -> String + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            include: Box::new(include),
            key_of: Box::new(key_of),
            by_key: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rebuilds the index from scratch over `annotations`.
    pub fn initialize<I>(&mut self, annotations: I, progress: &mut dyn ProgressSink)
    where
        I: IntoIterator<Item = Arc<Annotation>>,
    {
        self.by_key.clear();
        progress.report_message(&format!("Indexing {}", self.name));
        for annotation in annotations {
            self.notify_of_addition(annotation);
        }
        tracing::debug!(index = %self.name, keys = self.by_key.len(), "index built");
    }

    /// Adds `annotation` if it satisfies the inclusion predicate.
    ///
    /// Returns whether the annotation was indexed.
    pub fn notify_of_addition(&mut self, annotation: Arc<Annotation>) -> bool {
        if !(self.include)(&annotation) {
            return false;
        }
        let key = (self.key_of)(&annotation);
        self.by_key.entry(key).or_default().push(annotation);
        true
    }

    /// Removes this exact `annotation` instance from the index.
    ///
    /// Equal but distinct annotations under the same key stay indexed.
    /// Returns whether anything was removed.
    pub fn notify_of_deletion(&mut self, annotation: &Arc<Annotation>) -> bool {
        let key = (self.key_of)(annotation);
        let Some(entries) = self.by_key.get_mut(&key) else {
            return false;
        };

        let Some(pos) = entries.iter().position(|a| Arc::ptr_eq(a, annotation)) else {
            return false;
        };
        entries.remove(pos);
        if entries.is_empty() {
            self.by_key.remove(&key);
        }
        true
    }

    /// Exact-key lookup. A missing key yields an empty result.
    pub fn get_matches_by_key(&self, key: &str) -> Vec<Arc<Annotation>> {
        self.by_key.get(key).cloned().unwrap_or_default()
    }

    /// Scans every key and returns the annotations of keys accepted by `matches`.
    pub fn get_matches<P>(&self, matches: P, progress: &mut dyn ProgressSink) -> Vec<Arc<Annotation>>
    where
        P: Fn(&str) -> bool,
    {
        let total = self.by_key.len();
        let mut found = Vec::new();

        for (done, (key, annotations)) in self.by_key.iter().enumerate() {
            if matches(key) {
                found.extend(annotations.iter().cloned());
            }
            progress.report_step(done + 1, total);
        }

        found
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }

    /// Number of indexed annotations.
    pub fn len(&self) -> usize {
        self.by_key.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl fmt::Debug for AnnotationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationIndex")
            .field("name", &self.name)
            .field("keys", &self.by_key.len())
            .finish()
    }
}
