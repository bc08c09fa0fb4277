//! Entry encoders
//!
//! This module provides:
//! - The encoder traits fields are rendered through (`ObjectEncoder`,
//!   `ArrayEncoder`, `PrimitiveEncoder`)
//! - Marshaler traits for nested objects and arrays
//! - `MixedEncoder`: the mixed/JSON/console line renderer
//! - Pooled byte buffers and encoder configuration

pub mod buffer;
pub mod config;
pub mod mixed;
pub mod pool;

pub use buffer::Buffer;
pub use config::{DurationEncoding, EncoderConfig, Layout, TimeEncoding};
pub use mixed::MixedEncoder;
pub use pool::{Pool, Reset};

use crate::core::error::Result;
use crate::core::field::{Field, Reflect};
use crate::core::log_entry::LogEntry;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Scalar values that can be appended to any output position
pub trait PrimitiveEncoder {
    fn append_bool(&mut self, value: bool);
    fn append_i64(&mut self, value: i64);
    fn append_u64(&mut self, value: u64);
    fn append_f64(&mut self, value: f64);
    fn append_f32(&mut self, value: f32);
    fn append_complex128(&mut self, re: f64, im: f64);
    fn append_complex64(&mut self, re: f32, im: f32);
    fn append_str(&mut self, value: &str);
    fn append_byte_string(&mut self, value: &[u8]);
}

/// Encoder for the elements of an array
pub trait ArrayEncoder: PrimitiveEncoder {
    fn append_duration(&mut self, value: Duration);
    fn append_time(&mut self, value: DateTime<Utc>);
    fn append_array(&mut self, value: &dyn ArrayMarshaler) -> Result<()>;
    fn append_object(&mut self, value: &dyn ObjectMarshaler) -> Result<()>;
    fn append_reflected(&mut self, value: &dyn Reflect) -> Result<()>;
}

/// Encoder for key/value pairs of an object
pub trait ObjectEncoder {
    fn add_bool(&mut self, key: &str, value: bool);
    fn add_i64(&mut self, key: &str, value: i64);
    fn add_u64(&mut self, key: &str, value: u64);
    fn add_f64(&mut self, key: &str, value: f64);
    fn add_f32(&mut self, key: &str, value: f32);
    fn add_complex128(&mut self, key: &str, re: f64, im: f64);
    fn add_complex64(&mut self, key: &str, re: f32, im: f32);
    fn add_str(&mut self, key: &str, value: &str);
    fn add_byte_string(&mut self, key: &str, value: &[u8]);
    /// Base64 (standard alphabet) string
    fn add_binary(&mut self, key: &str, value: &[u8]);
    fn add_duration(&mut self, key: &str, value: Duration);
    fn add_time(&mut self, key: &str, value: DateTime<Utc>);
    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()>;
    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()>;
    fn add_reflected(&mut self, key: &str, value: &dyn Reflect) -> Result<()>;
    /// Open a nested object; it stays open until the entry is finished
    fn open_namespace(&mut self, key: &str);
}

/// Types that render themselves as a nested object
pub trait ObjectMarshaler: Send + Sync {
    fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()>;
}

/// Types that render themselves as an array
pub trait ArrayMarshaler: Send + Sync {
    fn marshal_array(&self, enc: &mut dyn ArrayEncoder) -> Result<()>;
}

/// An encoder template: fields added through `ObjectEncoder` are carried
/// into every entry it encodes afterwards.
pub trait Encoder: ObjectEncoder + Send + Sync {
    /// Copy of this encoder including the fields accumulated so far
    fn clone_encoder(&self) -> Box<dyn Encoder>;

    /// Render one entry into a pooled buffer
    ///
    /// The caller owns the returned buffer and should hand it back with
    /// [`Buffer::release`] once written.
    fn encode_entry(&self, entry: &LogEntry, fields: &[Field]) -> Result<Buffer>;
}
