//! Log entry structure

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use std::fmt;
use std::panic::Location;

/// Source location of a log call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub file: String,
    pub line: u32,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Build from a `#[track_caller]` location
    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }

    /// `file:line` with the full path
    pub fn full_path(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }

    /// `dir/file:line`, keeping only the last directory component
    pub fn trimmed_path(&self) -> String {
        let file = self.file.replace('\\', "/");
        let mut parts = file.rsplitn(3, '/');
        let name = parts.next().unwrap_or_default();
        match parts.next() {
            Some(dir) => format!("{}/{}:{}", dir, name, self.line),
            None => format!("{}:{}", name, self.line),
        }
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One log record, as handed to encoders
///
/// Structured fields travel alongside the entry as `&[Field]` so that
/// fields accumulated on a logger never need to be copied into it.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger_name: String,
    pub caller: Option<Caller>,
    pub message: String,
    pub stack: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger_name: String::new(),
            caller: None,
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_logger_name(mut self, name: impl Into<String>) -> Self {
        self.logger_name = name.into();
        self
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
