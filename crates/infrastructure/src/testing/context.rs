//! A test context that keeps everything it is told.

use apitrial_domain::TestContext;

/// One line reported to a [`RecordingContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextEntry {
    /// Plain log line.
    Log(String),
    /// Soft failure.
    Error(String),
    /// Hard failure; the case that raised it was abandoned.
    Fatal(String),
}

/// Records log lines and failures in order and mirrors them to `tracing`.
///
/// A run never aborts on its own; inspect [`RecordingContext::failed`] (or the
/// individual accessors) once it completes.
#[derive(Debug, Clone, Default)]
pub struct RecordingContext {
    name: String,
    entries: Vec<ContextEntry>,
}

impl RecordingContext {
    /// Creates an empty context for the named test.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Name given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every entry in the order it was reported.
    #[must_use]
    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }

    /// Log lines only.
    #[must_use]
    pub fn logs(&self) -> Vec<&str> {
        self.collect(|entry| match entry {
            ContextEntry::Log(line) => Some(line),
            _ => None,
        })
    }

    /// Soft failures only.
    #[must_use]
    pub fn errors(&self) -> Vec<&str> {
        self.collect(|entry| match entry {
            ContextEntry::Error(message) => Some(message),
            _ => None,
        })
    }

    /// Hard failures only.
    #[must_use]
    pub fn fatal_failures(&self) -> Vec<&str> {
        self.collect(|entry| match entry {
            ContextEntry::Fatal(message) => Some(message),
            _ => None,
        })
    }

    /// True once any failure, soft or hard, has been reported.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| !matches!(entry, ContextEntry::Log(_)))
    }

    fn collect<'a, F>(&'a self, select: F) -> Vec<&'a str>
    where
        F: Fn(&'a ContextEntry) -> Option<&'a String>,
    {
        self.entries
            .iter()
            .filter_map(select)
            .map(String::as_str)
            .collect()
    }
}

impl TestContext for RecordingContext {
    fn log(&mut self, line: &str) {
        tracing::info!(test = %self.name, "{line}");
        self.entries.push(ContextEntry::Log(line.to_string()));
    }

    fn error(&mut self, message: &str) {
        tracing::warn!(test = %self.name, "{message}");
        self.entries.push(ContextEntry::Error(message.to_string()));
    }

    fn fail_now(&mut self, message: &str) {
        tracing::error!(test = %self.name, "{message}");
        self.entries.push(ContextEntry::Fatal(message.to_string()));
    }
}
