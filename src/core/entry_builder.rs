//! Fluent construction of a single log entry

use super::error::Result;
use super::field::{Field, FieldValue};
use super::log_level::LogLevel;
use super::logger::Logger;

/// Builder collecting the message and fields of one entry
///
/// # Example
///
/// ```
/// use rust_log_writer::core::Logger;
///
/// let logger = Logger::nop();
///
/// logger.info_builder()
///     .message("Request processed")
///     .field("user_id", 12345)
///     .field("latency_ms", 42.5)
///     .field("status", 200)
///     .log()
///     .unwrap();
/// ```
#[must_use = "an entry is only written by calling `log`"]
pub struct EntryBuilder<'a> {
    logger: &'a Logger,
    level: LogLevel,
    message: String,
    fields: Vec<Field>,
}

impl<'a> EntryBuilder<'a> {
    pub fn new(logger: &'a Logger, level: LogLevel) -> Self {
        Self {
            logger,
            level,
            message: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = msg.into();
        self
    }

    pub fn field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.push(Field::new(key, value));
        self
    }

    /// Append prepared fields, e.g. [`Field::reflected`] or [`Field::error`]
    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Write the entry; the call site of `log` is the recorded caller
    #[track_caller]
    pub fn log(self) -> Result<()> {
        self.logger.log(self.level, self.message, &self.fields)
    }
}

impl Logger {
    pub fn builder(&self, level: LogLevel) -> EntryBuilder<'_> {
        EntryBuilder::new(self, level)
    }

    pub fn debug_builder(&self) -> EntryBuilder<'_> {
        EntryBuilder::new(self, LogLevel::Debug)
    }

    /// Create an info-level entry builder
    ///
    /// # Example
    ///
    /// ```
    /// use rust_log_writer::core::Logger;
    ///
    /// let logger = Logger::nop();
    /// logger.info_builder()
    ///     .message("Cache warmed")
    ///     .field("entries", 1024u32)
    ///     .log()
    ///     .unwrap();
    /// ```
    pub fn info_builder(&self) -> EntryBuilder<'_> {
        EntryBuilder::new(self, LogLevel::Info)
    }

    pub fn warn_builder(&self) -> EntryBuilder<'_> {
        EntryBuilder::new(self, LogLevel::Warn)
    }

    pub fn error_builder(&self) -> EntryBuilder<'_> {
        EntryBuilder::new(self, LogLevel::Error)
    }

    pub fn fatal_builder(&self) -> EntryBuilder<'_> {
        EntryBuilder::new(self, LogLevel::Fatal)
    }
}
