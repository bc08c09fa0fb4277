//! A single output path: encoder, sink and minimum level

use super::error::Result;
use super::field::Field;
use super::log_entry::LogEntry;
use super::log_level::{AtomicLevel, LogLevel};
use super::sink::Sink;
use crate::encoder::Encoder;
use std::fmt;
use std::sync::Arc;

/// Encodes entries at or above its level and writes them to its sink
///
/// Several cores may share one sink; each write of an encoded line is a
/// single `Sink::write` call, so lines from different cores never
/// interleave mid-line.
pub struct LogCore {
    encoder: Box<dyn Encoder>,
    sink: Arc<dyn Sink>,
    level: AtomicLevel,
}

impl LogCore {
    pub fn new(encoder: Box<dyn Encoder>, sink: Arc<dyn Sink>, level: AtomicLevel) -> Self {
        Self {
            encoder,
            sink,
            level,
        }
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.level.enabled(level)
    }

    /// Core whose encoder carries `fields` as context on every entry
    ///
    /// The sink and the level cell are shared with `self`.
    pub fn with(&self, fields: &[Field]) -> LogCore {
        let mut encoder = self.encoder.clone_encoder();
        for field in fields {
            field.add_to(encoder.as_mut());
        }
        LogCore {
            encoder,
            sink: Arc::clone(&self.sink),
            level: self.level.clone(),
        }
    }

    /// Encode and write one entry, regardless of level
    ///
    /// Entries above `Error` are synced right away.
    pub fn write(&self, entry: &LogEntry, fields: &[Field]) -> Result<()> {
        let buf = self.encoder.encode_entry(entry, fields)?;
        let written = self.sink.write(buf.as_bytes());
        buf.release();
        written?;

        if entry.level > LogLevel::Error {
            self.sink.sync()?;
        }
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.sink.sync()
    }

    pub fn level(&self) -> &AtomicLevel {
        &self.level
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }
}

impl fmt::Debug for LogCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogCore")
            .field("sink", &self.sink.name())
            .field("level", &self.level.level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{DurationEncoding, EncoderConfig, MixedEncoder, TimeEncoding};
    use crate::sinks::MemorySink;

    fn core(sink: &Arc<MemorySink>, level: LogLevel) -> LogCore {
        let config = EncoderConfig::new(TimeEncoding::Iso8601, DurationEncoding::Seconds);
        LogCore::new(
            Box::new(MixedEncoder::json(config)),
            Arc::clone(sink) as Arc<dyn Sink>,
            AtomicLevel::new(level),
        )
    }

    #[test]
    fn test_enabled_follows_shared_level() {
        let sink = Arc::new(MemorySink::new());
        let core = core(&sink, LogLevel::Warn);
        assert!(!core.enabled(LogLevel::Info));
        assert!(core.enabled(LogLevel::Error));

        core.level().set_level(LogLevel::Debug);
        assert!(core.enabled(LogLevel::Debug));
    }

    #[test]
    fn test_write_produces_one_line() {
        let sink = Arc::new(MemorySink::new());
        let core = core(&sink, LogLevel::Info);

        core.write(&LogEntry::new(LogLevel::Info, "started"), &[Field::new("port", 8080)])
            .unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(value["message"], "started");
        assert_eq!(value["port"], 8080);
        assert_eq!(sink.sync_count(), 0);
    }

    #[test]
    fn test_with_adds_context_without_touching_parent() {
        let sink = Arc::new(MemorySink::new());
        let parent = core(&sink, LogLevel::Info);
        let child = parent.with(&[Field::new("request", "r-1")]);

        child.write(&LogEntry::new(LogLevel::Info, "child"), &[]).unwrap();
        parent.write(&LogEntry::new(LogLevel::Info, "parent"), &[]).unwrap();

        let lines = sink.lines();
        assert!(lines[0].contains("\"request\":\"r-1\""));
        assert!(!lines[1].contains("request"));
    }

    #[test]
    fn test_severe_entries_are_synced() {
        let sink = Arc::new(MemorySink::new());
        let core = core(&sink, LogLevel::Info);

        core.write(&LogEntry::new(LogLevel::Error, "bad"), &[]).unwrap();
        assert_eq!(sink.sync_count(), 0);
        core.write(&LogEntry::new(LogLevel::DPanic, "worse"), &[]).unwrap();
        assert_eq!(sink.sync_count(), 1);
    }

    #[test]
    fn test_write_error_from_closed_sink() {
        let sink = Arc::new(MemorySink::new());
        let core = core(&sink, LogLevel::Info);
        sink.close().unwrap();
        assert!(core.write(&LogEntry::new(LogLevel::Info, "late"), &[]).is_err());
    }
}
