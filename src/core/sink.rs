//! Sink trait for log output destinations

use super::error::Result;

/// A physical output destination
///
/// Sinks synchronize internally so that one instance can be shared by
/// every core writing to the same destination. A single `write` call
/// carries one complete encoded line and is never interleaved with
/// another call on the same sink.
pub trait Sink: Send + Sync {
    fn write(&self, bytes: &[u8]) -> Result<usize>;
    fn sync(&self) -> Result<()>;
    fn close(&self) -> Result<()>;
    fn name(&self) -> &str;
}
