//! Fan-out logger over the cores of one name group

use super::error::{LoggerError, Result};
use super::field::Field;
use super::log_core::LogCore;
use super::log_entry::{Caller, LogEntry};
use super::log_level::LogLevel;
use super::metrics::LoggerMetrics;
use std::backtrace::Backtrace;
use std::panic::Location;
use std::sync::Arc;

/// Named logger delivering each entry to every enabled core
///
/// A logger without cores is a no-op: every call succeeds without writing
/// anything. Cloning is cheap; clones and derived loggers share cores,
/// sinks and metrics.
///
/// `DPanic`, `Panic` and `Fatal` entries are written and synced like any
/// other entry. None of them terminates the process or unwinds.
///
/// # Example
///
/// ```
/// use rust_log_writer::core::{AtomicLevel, Field, LogCore, LogLevel, Logger};
/// use rust_log_writer::encoder::{EncoderConfig, MixedEncoder};
/// use rust_log_writer::sinks::MemorySink;
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let core = LogCore::new(
///     Box::new(MixedEncoder::json(EncoderConfig::default())),
///     sink.clone(),
///     AtomicLevel::new(LogLevel::Info),
/// );
/// let logger = Logger::new("api", vec![Arc::new(core)]);
///
/// logger.info("request served", &[Field::new("status", 200)]).unwrap();
/// assert_eq!(sink.lines(), vec![r#"{"status":200}"#]);
/// ```
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
    cores: Vec<Arc<LogCore>>,
    metrics: Arc<LoggerMetrics>,
    add_caller: bool,
    stacktrace_level: Option<LogLevel>,
}

impl Logger {
    pub fn new(name: impl Into<String>, cores: Vec<Arc<LogCore>>) -> Self {
        Self {
            name: name.into(),
            cores,
            metrics: Arc::new(LoggerMetrics::new()),
            add_caller: false,
            stacktrace_level: None,
        }
    }

    /// Logger that discards everything
    pub fn nop() -> Self {
        Self::new("", Vec::new())
    }

    pub fn is_nop(&self) -> bool {
        self.cores.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child logger whose name is `self.name` and `name` joined by a dot
    #[must_use]
    pub fn named(&self, name: &str) -> Logger {
        let mut child = self.clone();
        if name.is_empty() {
            return child;
        }
        child.name = if self.name.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.name, name)
        };
        child
    }

    /// Child logger adding `fields` to every entry
    #[must_use]
    pub fn with(&self, fields: &[Field]) -> Logger {
        let mut child = self.clone();
        if !fields.is_empty() {
            child.cores = self.cores.iter().map(|core| Arc::new(core.with(fields))).collect();
        }
        child
    }

    /// Record the call site of every entry
    #[must_use]
    pub fn with_caller(&self, enabled: bool) -> Logger {
        let mut child = self.clone();
        child.add_caller = enabled;
        child
    }

    /// Capture a stack trace for entries at or above `level`
    #[must_use]
    pub fn with_stacktrace(&self, level: LogLevel) -> Logger {
        let mut child = self.clone();
        child.stacktrace_level = Some(level);
        child
    }

    /// Whether any core would accept an entry at `level`
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.cores.iter().any(|core| core.enabled(level))
    }

    /// Deliver one entry to every core enabled for `level`
    ///
    /// A failing core does not stop delivery to the others. The first
    /// error is returned after every core has been tried.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>, fields: &[Field]) -> Result<()> {
        if !self.enabled(level) {
            if !self.is_nop() {
                self.metrics.record_filtered();
            }
            return Ok(());
        }

        let mut entry = LogEntry::new(level, message).with_logger_name(self.name.as_str());
        if self.add_caller {
            entry = entry.with_caller(Caller::from_location(Location::caller()));
        }
        if self.stacktrace_level.is_some_and(|threshold| level >= threshold) {
            entry = entry.with_stack(Backtrace::force_capture().to_string());
        }

        let mut first_error: Option<LoggerError> = None;
        for (index, core) in self.cores.iter().enumerate() {
            if !core.enabled(level) {
                continue;
            }
            if let Err(e) = core.write(&entry, fields) {
                eprintln!(
                    "[LOGGER ERROR] Core #{} ({}) failed to write entry: {}",
                    index,
                    core.sink().name(),
                    e
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            None => {
                self.metrics.record_logged();
                Ok(())
            }
            Some(e) => {
                self.metrics.record_write_failure();
                Err(e)
            }
        }
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>, fields: &[Field]) -> Result<()> {
        self.log(LogLevel::Debug, message, fields)
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<String>, fields: &[Field]) -> Result<()> {
        self.log(LogLevel::Info, message, fields)
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl Into<String>, fields: &[Field]) -> Result<()> {
        self.log(LogLevel::Warn, message, fields)
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<String>, fields: &[Field]) -> Result<()> {
        self.log(LogLevel::Error, message, fields)
    }

    #[inline]
    #[track_caller]
    pub fn dpanic(&self, message: impl Into<String>, fields: &[Field]) -> Result<()> {
        self.log(LogLevel::DPanic, message, fields)
    }

    #[inline]
    #[track_caller]
    pub fn panic(&self, message: impl Into<String>, fields: &[Field]) -> Result<()> {
        self.log(LogLevel::Panic, message, fields)
    }

    #[inline]
    #[track_caller]
    pub fn fatal(&self, message: impl Into<String>, fields: &[Field]) -> Result<()> {
        self.log(LogLevel::Fatal, message, fields)
    }

    /// Flush every sink behind this logger, returning the first error
    pub fn sync(&self) -> Result<()> {
        let mut first_error = None;
        for core in &self.cores {
            if let Err(e) = core.sync() {
                self.metrics.record_sync_failure();
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn cores(&self) -> &[Arc<LogCore>] {
        &self.cores
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::nop()
    }
}
