//! Progress reporting for long-running scans.
//!
//! The core never depends on a concrete progress display. Anything that can
//! accept a step count or a message can observe a scan through [`ProgressSink`].

/// Receives progress updates from long-running operations.
pub trait ProgressSink {
    /// Reports that `done` of `total` units of work have completed.
    fn report_step(&mut self, done: usize, total: usize);

    /// Reports a free-form status message.
    fn report_message(&mut self, message: &str);
}

impl<F: FnMut(usize, usize)> ProgressSink for F {
    fn report_step(&mut self, done: usize, total: usize) {
        self(done, total);
    }

    fn report_message(&mut self, _message: &str) {}
}

/// A progress sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report_step(&mut self, _done: usize, _total: usize) {}

    fn report_message(&mut self, _message: &str) {}
}

/// Forwards progress to `tracing` at debug level.
#[derive(Debug, Default, Clone)]
pub struct TracingProgress {
    label: String,
}

impl TracingProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProgressSink for TracingProgress {
    fn report_step(&mut self, done: usize, total: usize) {
        tracing::debug!(label = %self.label, done, total, "progress");
    }

    fn report_message(&mut self, message: &str) {
        tracing::debug!(label = %self.label, "{}", message);
    }
}
