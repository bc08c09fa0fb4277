//! Standard output and standard error sinks

use crate::core::{Result, Sink};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdout,
    Stderr,
}

/// Sink writing to the process's stdout or stderr
///
/// Each write holds the stream lock for the whole line. Closing only
/// flushes; the process keeps its standard streams.
#[derive(Debug)]
pub struct StreamSink {
    stream: StdStream,
}

impl StreamSink {
    pub fn stdout() -> Self {
        Self {
            stream: StdStream::Stdout,
        }
    }

    pub fn stderr() -> Self {
        Self {
            stream: StdStream::Stderr,
        }
    }

    pub fn stream(&self) -> StdStream {
        self.stream
    }
}

impl Sink for StreamSink {
    fn write(&self, bytes: &[u8]) -> Result<usize> {
        match self.stream {
            StdStream::Stdout => io::stdout().lock().write_all(bytes)?,
            StdStream::Stderr => io::stderr().lock().write_all(bytes)?,
        }
        Ok(bytes.len())
    }

    fn sync(&self) -> Result<()> {
        match self.stream {
            StdStream::Stdout => io::stdout().flush()?,
            StdStream::Stderr => io::stderr().flush()?,
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.sync()
    }

    fn name(&self) -> &str {
        match self.stream {
            StdStream::Stdout => "stdout",
            StdStream::Stderr => "stderr",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(StreamSink::stdout().name(), "stdout");
        assert_eq!(StreamSink::stderr().name(), "stderr");
    }

    #[test]
    fn test_close_keeps_stream_usable() {
        let sink = StreamSink::stderr();
        sink.close().unwrap();
        assert_eq!(sink.write(b"").unwrap(), 0);
    }
}
