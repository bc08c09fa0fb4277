//! In-memory sink for tests and diagnostics

use crate::core::{LoggerError, Result, Sink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Sink collecting every written byte
///
/// # Example
///
/// ```
/// use rust_log_writer::sinks::MemorySink;
/// use rust_log_writer::core::Sink;
///
/// let sink = MemorySink::new();
/// sink.write(b"one\n").unwrap();
/// sink.write(b"two\n").unwrap();
/// assert_eq!(sink.lines(), vec!["one", "two"]);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    bytes: Mutex<Vec<u8>>,
    writes: AtomicU64,
    syncs: AtomicU64,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.bytes.lock().clone()
    }

    /// Contents as text, with invalid UTF-8 replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.bytes.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.lock().is_empty()
    }

    /// Number of successful `write` calls
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn sync_count(&self) -> u64 {
        self.syncs.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Sink for MemorySink {
    fn write(&self, bytes: &[u8]) -> Result<usize> {
        if self.is_closed() {
            return Err(LoggerError::sink_closed("memory"));
        }
        self.bytes.lock().extend_from_slice(bytes);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(bytes.len())
    }

    fn sync(&self) -> Result<()> {
        self.syncs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
