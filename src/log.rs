//! Logging sink
//!
//! Components never write to stdout/stderr themselves. They hold a
//! [`Logger`], which tags every line with the component name and forwards
//! it to an injected [`LogSink`]. The process decides where lines go: the
//! `tracing` ecosystem, nowhere, or an in-memory buffer.

use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for log lines
///
/// Implementations must emit each call as one atomic line; several worker
/// threads log concurrently.
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, component: &'static str, message: &str);
}

/// Forwards lines to the `tracing` macros
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, component: &'static str, message: &str) {
        match level {
            Level::Debug => tracing::debug!(component = component, "{}", message),
            Level::Info => tracing::info!(component = component, "{}", message),
            Level::Error => tracing::error!(component = component, "{}", message),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _level: Level, _component: &'static str, _message: &str) {}
}

/// A captured log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub component: &'static str,
    pub message: String,
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct CaptureSink {
    records: Mutex<Vec<Record>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines logged so far
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// True if any line at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records()
            .iter()
            .any(|r| r.level == level && r.message.contains(needle))
    }
}

impl LogSink for CaptureSink {
    fn log(&self, level: Level, component: &'static str, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Record {
                level,
                component,
                message: message.to_string(),
            });
    }
}

/// Component-scoped handle onto a shared sink
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn LogSink>,
    component: &'static str,
}

impl Logger {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Logger {
            sink,
            component: "echopool",
        }
    }

    /// Logger backed by [`TracingSink`]
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// Logger that drops every line
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Same sink, different component tag
    pub fn scoped(&self, component: &'static str) -> Self {
        Logger {
            sink: Arc::clone(&self.sink),
            component,
        }
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn log(&self, level: Level, message: impl fmt::Display) {
        self.sink.log(level, self.component, &message.to_string());
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .finish_non_exhaustive()
    }
}
