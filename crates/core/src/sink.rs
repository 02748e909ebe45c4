//! Error accumulation
//!
//! Per-entry failures do not stop a sync; they are collected here and
//! returned with the final report. When an error log is configured every
//! error is also appended to that file through a buffer that is flushed
//! when the errors are collected.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};

/// Stage of a sync run that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Walk,
    Upload,
    Reconcile,
    Invalidate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Walk => "walk",
            Stage::Upload => "upload",
            Stage::Reconcile => "reconcile",
            Stage::Invalidate => "invalidate",
        };
        f.write_str(name)
    }
}

/// An error tied to the stage and entry it happened on
#[derive(Debug)]
pub struct SyncError {
    pub stage: Stage,
    /// Path, key or distribution the error concerns
    pub subject: String,
    pub error: Error,
}

impl SyncError {
    pub fn new(stage: Stage, subject: impl Into<String>, error: Error) -> Self {
        Self {
            stage,
            subject: subject.into(),
            error,
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.subject, self.error)
    }
}

impl Serialize for SyncError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("SyncError", 3)?;
        state.serialize_field("stage", &self.stage)?;
        state.serialize_field("subject", &self.subject)?;
        state.serialize_field("error", &self.error.to_string())?;
        state.end()
    }
}

/// Append-only collection of sync errors
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: Vec<SyncError>,
    log: Option<BufWriter<File>>,
}

impl ErrorSink {
    /// An in-memory sink
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that also appends every error to `path`
    pub fn with_log(path: &Path) -> Result<Self> {
        let log = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            errors: Vec::new(),
            log: Some(BufWriter::new(log)),
        })
    }

    /// Record an error
    pub fn push(&mut self, error: SyncError) {
        tracing::error!(stage = %error.stage, subject = %error.subject, "{}", error.error);

        if let Some(log) = &mut self.log {
            if let Err(e) = writeln!(log, "{error}\n") {
                tracing::warn!("Failed to write error log: {e}");
            }
        }

        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Take the collected errors, flushing the log file
    pub fn into_errors(mut self) -> Vec<SyncError> {
        if let Some(mut log) = self.log.take() {
            if let Err(e) = log.flush() {
                tracing::warn!("Failed to write error log: {e}");
            }
        }
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink() {
        let mut sink = ErrorSink::new();
        assert!(sink.is_empty());

        sink.push(SyncError::new(
            Stage::Upload,
            "a.txt",
            Error::Network("timeout".into()),
        ));
        assert_eq!(sink.len(), 1);

        let errors = sink.into_errors();
        assert_eq!(errors[0].to_string(), "[upload] a.txt: Network error: timeout");
    }

    #[test]
    fn test_log_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("errors.log");

        let mut sink = ErrorSink::with_log(&log_path).unwrap();
        sink.push(SyncError::new(Stage::Walk, "/src/x", Error::General("boom".into())));
        sink.push(SyncError::new(Stage::Walk, "/src/y", Error::General("bang".into())));
        drop(sink);

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("[walk] /src/x: boom"));
        assert!(content.contains("[walk] /src/y: bang"));
    }

    #[test]
    fn test_log_flushed_on_collect() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("errors.log");

        let mut sink = ErrorSink::with_log(&log_path).unwrap();
        sink.push(SyncError::new(Stage::Upload, "a.txt", Error::Network("reset".into())));
        let errors = sink.into_errors();

        assert_eq!(errors.len(), 1);
        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("[upload] a.txt: Network error: reset"));
    }

    #[test]
    fn test_serialize_error() {
        let err = SyncError::new(Stage::Reconcile, "old.txt", Error::Auth("denied".into()));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["stage"], "reconcile");
        assert_eq!(json["error"], "Authentication failed: denied");
    }
}
