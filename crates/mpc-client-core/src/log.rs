//! Operator log
//!
//! Append-only record of the messages each step reports to the operator. It is
//! a rendering artifact: nothing in the client reads it back to make a
//! decision. Diagnostics for developers go through `tracing` instead.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// One line of the operator log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Shared append-only log buffer
///
/// Cloning yields another handle to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    entries: Arc<RwLock<Vec<LogEntry>>>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn append(&self, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        };
        self.entries.write().push(entry);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copy of all entries in append order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().clone()
    }

    /// Messages in append order
    pub fn lines(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    /// Most recent message
    pub fn last(&self) -> Option<String> {
        self.entries.read().last().map(|e| e.message.clone())
    }

    /// Newline-joined text, as shown in the operator's log view
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}
