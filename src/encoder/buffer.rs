//! Growable byte buffer handed from encoders to sinks

use super::pool::{Pool, Reset};
use once_cell::sync::Lazy;
use std::fmt;
use std::io::Write;

static BUFFER_POOL: Lazy<Pool<Buffer>> = Lazy::new(Pool::new);

const INITIAL_CAPACITY: usize = 1024;

#[derive(Clone, PartialEq, Eq)]
pub struct Buffer {
    bytes: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Take an empty buffer from the shared pool
    pub fn acquire() -> Self {
        BUFFER_POOL.acquire()
    }

    /// Return this buffer to the shared pool
    pub fn release(self) {
        BUFFER_POOL.release(self);
    }

    /// Number of idle buffers in the shared pool
    pub fn pooled() -> usize {
        BUFFER_POOL.idle()
    }

    #[inline]
    pub fn append_byte(&mut self, b: u8) {
        self.bytes.push(b);
    }

    #[inline]
    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    #[inline]
    pub fn append_str(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
    }

    pub fn append_i64(&mut self, value: i64) {
        let _ = write!(self.bytes, "{}", value);
    }

    pub fn append_u64(&mut self, value: u64) {
        let _ = write!(self.bytes, "{}", value);
    }

    /// Shortest decimal form that round-trips, never in exponent notation
    pub fn append_f64(&mut self, value: f64) {
        let _ = write!(self.bytes, "{}", value);
    }

    pub fn append_f32(&mut self, value: f32) {
        let _ = write!(self.bytes, "{}", value);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }
}

impl Reset for Buffer {
    fn reset(&mut self) {
        self.bytes.clear();
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Buffer")
            .field(&String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))
    }
}
