//! Mixed human/machine readable encoder
//!
//! Renders one entry per line in one of three layouts:
//!
//! ```text
//! mixed:   [2025-01-08T10:30:45.123Z] INFO [audit] login ok {"user":"bob"}
//! json:    {"level":"INFO","timestamp":"2025-01-08T10:30:45.123Z","name":"audit","message":"login ok","user":"bob"}
//! console: 2025-01-08T10:30:45.123Z<TAB>INFO<TAB>audit<TAB>login ok<TAB>{"user":"bob"}
//! ```
//!
//! Fields added to the encoder itself (through `ObjectEncoder`) form a
//! context that is rendered ahead of the per-entry fields. Every call to
//! `encode_entry` works on its own pooled copy of the encoder, so a single
//! template can be shared by any number of threads.

use super::buffer::Buffer;
use super::config::{epoch_nanos, EncoderConfig, Layout};
use super::pool::{Pool, Reset};
use super::{ArrayEncoder, ArrayMarshaler, Encoder, ObjectEncoder, ObjectMarshaler, PrimitiveEncoder};
use crate::core::error::{LoggerError, Result};
use crate::core::field::{Field, Reflect};
use crate::core::log_entry::LogEntry;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

static ENCODER_POOL: Lazy<Pool<MixedEncoder>> = Lazy::new(Pool::new);

const HEX: &[u8; 16] = b"0123456789abcdef";

#[derive(Debug, Clone)]
pub struct MixedEncoder {
    config: Arc<EncoderConfig>,
    buf: Buffer,
    /// Add a space after colons and commas
    spaced: bool,
    open_namespaces: usize,
    layout: Layout,
}

impl MixedEncoder {
    /// Mixed layout encoder
    pub fn new(config: EncoderConfig) -> Self {
        Self::with_layout(config, Layout::Mixed)
    }

    pub fn with_layout(config: EncoderConfig, layout: Layout) -> Self {
        Self {
            config: Arc::new(config),
            buf: Buffer::acquire(),
            spaced: false,
            open_namespaces: 0,
            layout,
        }
    }

    pub fn json(config: EncoderConfig) -> Self {
        Self::with_layout(config, Layout::Json)
    }

    pub fn console(config: EncoderConfig) -> Self {
        Self::with_layout(config, Layout::Console)
    }

    #[must_use]
    pub fn with_spacing(mut self, spaced: bool) -> Self {
        self.spaced = spaced;
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Bytes of the accumulated context fields
    pub fn context(&self) -> &[u8] {
        self.buf.as_bytes()
    }

    /// Number of encoders waiting in the shared pool
    pub fn pooled() -> usize {
        ENCODER_POOL.idle()
    }

    fn pooled_clone(&self) -> MixedEncoder {
        let mut clone = ENCODER_POOL.acquire();
        clone.config = Arc::clone(&self.config);
        clone.spaced = self.spaced;
        clone.open_namespaces = self.open_namespaces;
        clone.layout = self.layout;
        clone
    }

    /// Hand the working buffer to the caller and return the encoder to the pool
    fn finish(mut self) -> Buffer {
        let line = std::mem::replace(&mut self.buf, Buffer::acquire());
        ENCODER_POOL.release(self);
        line
    }

    fn encode_mixed(&self, entry: &LogEntry, fields: &[Field]) -> Buffer {
        let config = &self.config;
        let mut last = self.pooled_clone();
        let mut caller_space = false;

        {
            let mut wr = DirectWriter { buf: &mut last.buf };

            if !config.time_key.is_empty() {
                if let Some(encode_time) = &config.encode_time {
                    wr.buf.append_byte(b'[');
                    encode_time(entry.timestamp, &mut wr);
                    wr.buf.append_byte(b']');
                }
            }

            if !config.level_key.is_empty() {
                if let Some(encode_level) = &config.encode_level {
                    space_if_needed(wr.buf);
                    encode_level(entry.level, &mut wr);
                }
            }

            if !entry.logger_name.is_empty() && !config.name_key.is_empty() {
                space_if_needed(wr.buf);
                wr.buf.append_byte(b'[');
                wr.append_str(&entry.logger_name);
                wr.buf.append_byte(b']');
            }

            if let (Some(caller), Some(encode_caller)) = (&entry.caller, &config.encode_caller) {
                if !config.caller_key.is_empty() {
                    space_if_needed(wr.buf);
                    encode_caller(caller, &mut wr);
                    wr.buf.append_byte(b' ');
                    caller_space = true;
                }
            }
        }

        // The caller section already ends in the separator; the message is
        // written verbatim, trailing spaces included.
        if !config.message_key.is_empty() {
            if !caller_space {
                space_if_needed(&mut last.buf);
            }
            last.buf.append_str(&entry.message);
            caller_space &= entry.message.is_empty();
        }

        if !caller_space && !last.buf.is_empty() {
            last.buf.append_byte(b' ');
        }
        last.buf.append_byte(b'{');
        last.append_context_and_fields(&self.buf, fields);
        if let Some(stack) = &entry.stack {
            if !config.stacktrace_key.is_empty() {
                last.add_str(&config.stacktrace_key, stack);
            }
        }
        last.buf.append_byte(b'}');
        last.buf.append_byte(b'\n');

        last.finish()
    }

    fn encode_json(&self, entry: &LogEntry, fields: &[Field]) -> Buffer {
        let config = &self.config;
        let mut last = self.pooled_clone();
        last.buf.append_byte(b'{');

        if !config.level_key.is_empty() {
            if let Some(encode_level) = &config.encode_level {
                last.add_key(&config.level_key);
                let cur = last.buf.len();
                encode_level(entry.level, &mut last);
                if cur == last.buf.len() {
                    last.append_str(entry.level.to_str());
                }
            }
        }

        if !config.time_key.is_empty() {
            last.add_time(&config.time_key, entry.timestamp);
        }

        if !entry.logger_name.is_empty() && !config.name_key.is_empty() {
            last.add_str(&config.name_key, &entry.logger_name);
        }

        if let Some(caller) = &entry.caller {
            if !config.caller_key.is_empty() {
                if let Some(encode_caller) = &config.encode_caller {
                    last.add_key(&config.caller_key);
                    let cur = last.buf.len();
                    encode_caller(caller, &mut last);
                    if cur == last.buf.len() {
                        last.append_str(&caller.full_path());
                    }
                }
            }
        }

        if !config.message_key.is_empty() {
            last.add_str(&config.message_key, &entry.message);
        }

        last.append_context_and_fields(&self.buf, fields);
        if let Some(stack) = &entry.stack {
            if !config.stacktrace_key.is_empty() {
                last.add_str(&config.stacktrace_key, stack);
            }
        }
        last.buf.append_byte(b'}');
        last.buf.append_byte(b'\n');

        last.finish()
    }

    fn encode_console(&self, entry: &LogEntry, fields: &[Field]) -> Buffer {
        let config = &self.config;
        let mut line = Buffer::acquire();

        {
            let mut wr = DirectWriter { buf: &mut line };

            if !config.time_key.is_empty() {
                if let Some(encode_time) = &config.encode_time {
                    encode_time(entry.timestamp, &mut wr);
                }
            }

            if !config.level_key.is_empty() {
                if let Some(encode_level) = &config.encode_level {
                    tab_if_needed(wr.buf);
                    encode_level(entry.level, &mut wr);
                }
            }

            if !entry.logger_name.is_empty() && !config.name_key.is_empty() {
                tab_if_needed(wr.buf);
                wr.append_str(&entry.logger_name);
            }

            if let (Some(caller), Some(encode_caller)) = (&entry.caller, &config.encode_caller) {
                if !config.caller_key.is_empty() {
                    tab_if_needed(wr.buf);
                    encode_caller(caller, &mut wr);
                }
            }
        }

        if !config.message_key.is_empty() {
            tab_if_needed(&mut line);
            line.append_str(&entry.message);
        }

        let mut context = self.pooled_clone();
        context.append_context_and_fields(&self.buf, fields);
        if !context.buf.is_empty() {
            tab_if_needed(&mut line);
            line.append_byte(b'{');
            line.append_bytes(context.buf.as_bytes());
            line.append_byte(b'}');
        }
        ENCODER_POOL.release(context);

        if let Some(stack) = &entry.stack {
            if !config.stacktrace_key.is_empty() {
                line.append_byte(b'\n');
                line.append_str(stack);
            }
        }
        line.append_byte(b'\n');
        line
    }

    fn append_context_and_fields(&mut self, context: &Buffer, fields: &[Field]) {
        if !context.is_empty() {
            self.add_element_separator();
            self.buf.append_bytes(context.as_bytes());
        }
        for field in fields {
            field.add_to(self);
        }
        self.close_open_namespaces();
    }

    fn close_open_namespaces(&mut self) {
        for _ in 0..self.open_namespaces {
            self.buf.append_byte(b'}');
        }
        self.open_namespaces = 0;
    }

    fn add_key(&mut self, key: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        escape_str(&mut self.buf, key);
        self.buf.append_byte(b'"');
        self.buf.append_byte(b':');
        if self.spaced {
            self.buf.append_byte(b' ');
        }
    }

    fn add_element_separator(&mut self) {
        match self.buf.last() {
            None | Some(b'{') | Some(b'[') | Some(b':') | Some(b',') | Some(b' ') => {}
            Some(_) => {
                self.buf.append_byte(b',');
                if self.spaced {
                    self.buf.append_byte(b' ');
                }
            }
        }
    }
}

impl Default for MixedEncoder {
    fn default() -> Self {
        Self {
            config: EncoderConfig::empty(),
            buf: Buffer::new(),
            spaced: false,
            open_namespaces: 0,
            layout: Layout::Mixed,
        }
    }
}

impl Reset for MixedEncoder {
    fn reset(&mut self) {
        self.config = EncoderConfig::empty();
        self.buf.reset();
        self.spaced = false;
        self.open_namespaces = 0;
        self.layout = Layout::Mixed;
    }
}

impl PrimitiveEncoder for MixedEncoder {
    fn append_bool(&mut self, value: bool) {
        self.add_element_separator();
        self.buf.append_str(if value { "true" } else { "false" });
    }

    fn append_i64(&mut self, value: i64) {
        self.add_element_separator();
        self.buf.append_i64(value);
    }

    fn append_u64(&mut self, value: u64) {
        self.add_element_separator();
        self.buf.append_u64(value);
    }

    fn append_f64(&mut self, value: f64) {
        self.add_element_separator();
        if value.is_finite() {
            self.buf.append_f64(value);
        } else {
            self.buf.append_byte(b'"');
            append_non_finite(&mut self.buf, value);
            self.buf.append_byte(b'"');
        }
    }

    fn append_f32(&mut self, value: f32) {
        self.add_element_separator();
        if value.is_finite() {
            self.buf.append_f32(value);
        } else {
            self.buf.append_byte(b'"');
            append_non_finite(&mut self.buf, f64::from(value));
            self.buf.append_byte(b'"');
        }
    }

    fn append_complex128(&mut self, re: f64, im: f64) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        append_float_text(&mut self.buf, re);
        self.buf.append_byte(b'+');
        append_float_text(&mut self.buf, im);
        self.buf.append_byte(b'i');
        self.buf.append_byte(b'"');
    }

    fn append_complex64(&mut self, re: f32, im: f32) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        append_float32_text(&mut self.buf, re);
        self.buf.append_byte(b'+');
        append_float32_text(&mut self.buf, im);
        self.buf.append_byte(b'i');
        self.buf.append_byte(b'"');
    }

    fn append_str(&mut self, value: &str) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        escape_str(&mut self.buf, value);
        self.buf.append_byte(b'"');
    }

    fn append_byte_string(&mut self, value: &[u8]) {
        self.add_element_separator();
        self.buf.append_byte(b'"');
        escape_bytes(&mut self.buf, value);
        self.buf.append_byte(b'"');
    }
}

impl ArrayEncoder for MixedEncoder {
    fn append_duration(&mut self, value: Duration) {
        let cur = self.buf.len();
        if let Some(encode_duration) = self.config.encode_duration.clone() {
            encode_duration(value, self);
        }
        if cur == self.buf.len() {
            self.append_i64(i64::try_from(value.as_nanos()).unwrap_or(i64::MAX));
        }
    }

    fn append_time(&mut self, value: DateTime<Utc>) {
        let cur = self.buf.len();
        if let Some(encode_time) = self.config.encode_time.clone() {
            encode_time(value, self);
        }
        if cur == self.buf.len() {
            self.append_i64(epoch_nanos(value));
        }
    }

    fn append_array(&mut self, value: &dyn ArrayMarshaler) -> Result<()> {
        self.add_element_separator();
        self.buf.append_byte(b'[');
        let result = value.marshal_array(self);
        self.buf.append_byte(b']');
        result
    }

    fn append_object(&mut self, value: &dyn ObjectMarshaler) -> Result<()> {
        // Namespaces opened inside the object close with it.
        let outer = std::mem::take(&mut self.open_namespaces);
        self.add_element_separator();
        self.buf.append_byte(b'{');
        let result = value.marshal_object(self);
        self.close_open_namespaces();
        self.buf.append_byte(b'}');
        self.open_namespaces = outer;
        result
    }

    fn append_reflected(&mut self, value: &dyn Reflect) -> Result<()> {
        let json = value.to_json().map_err(LoggerError::from)?;
        self.add_element_separator();
        self.buf.append_bytes(&json);
        Ok(())
    }
}

impl ObjectEncoder for MixedEncoder {
    fn add_bool(&mut self, key: &str, value: bool) {
        self.add_key(key);
        self.append_bool(value);
    }

    fn add_i64(&mut self, key: &str, value: i64) {
        self.add_key(key);
        self.append_i64(value);
    }

    fn add_u64(&mut self, key: &str, value: u64) {
        self.add_key(key);
        self.append_u64(value);
    }

    fn add_f64(&mut self, key: &str, value: f64) {
        self.add_key(key);
        self.append_f64(value);
    }

    fn add_f32(&mut self, key: &str, value: f32) {
        self.add_key(key);
        self.append_f32(value);
    }

    fn add_complex128(&mut self, key: &str, re: f64, im: f64) {
        self.add_key(key);
        self.append_complex128(re, im);
    }

    fn add_complex64(&mut self, key: &str, re: f32, im: f32) {
        self.add_key(key);
        self.append_complex64(re, im);
    }

    fn add_str(&mut self, key: &str, value: &str) {
        self.add_key(key);
        self.append_str(value);
    }

    fn add_byte_string(&mut self, key: &str, value: &[u8]) {
        self.add_key(key);
        self.append_byte_string(value);
    }

    fn add_binary(&mut self, key: &str, value: &[u8]) {
        self.add_str(key, &general_purpose::STANDARD.encode(value));
    }

    fn add_duration(&mut self, key: &str, value: Duration) {
        self.add_key(key);
        self.append_duration(value);
    }

    fn add_time(&mut self, key: &str, value: DateTime<Utc>) {
        self.add_key(key);
        self.append_time(value);
    }

    fn add_array(&mut self, key: &str, value: &dyn ArrayMarshaler) -> Result<()> {
        self.add_key(key);
        self.append_array(value)
    }

    fn add_object(&mut self, key: &str, value: &dyn ObjectMarshaler) -> Result<()> {
        self.add_key(key);
        self.append_object(value)
    }

    fn add_reflected(&mut self, key: &str, value: &dyn Reflect) -> Result<()> {
        let json = value.to_json().map_err(LoggerError::from)?;
        self.add_key(key);
        self.buf.append_bytes(&json);
        Ok(())
    }

    fn open_namespace(&mut self, key: &str) {
        self.add_key(key);
        self.buf.append_byte(b'{');
        self.open_namespaces += 1;
    }
}

impl Encoder for MixedEncoder {
    fn clone_encoder(&self) -> Box<dyn Encoder> {
        Box::new(self.clone())
    }

    fn encode_entry(&self, entry: &LogEntry, fields: &[Field]) -> Result<Buffer> {
        Ok(match self.layout {
            Layout::Mixed => self.encode_mixed(entry, fields),
            Layout::Json => self.encode_json(entry, fields),
            Layout::Console => self.encode_console(entry, fields),
        })
    }
}

/// Writes values as plain text, for the line prefix of the mixed and
/// console layouts
struct DirectWriter<'a> {
    buf: &'a mut Buffer,
}

impl PrimitiveEncoder for DirectWriter<'_> {
    fn append_bool(&mut self, value: bool) {
        self.buf.append_str(if value { "true" } else { "false" });
    }

    fn append_i64(&mut self, value: i64) {
        self.buf.append_i64(value);
    }

    fn append_u64(&mut self, value: u64) {
        self.buf.append_u64(value);
    }

    fn append_f64(&mut self, value: f64) {
        append_float_text(self.buf, value);
    }

    fn append_f32(&mut self, value: f32) {
        append_float32_text(self.buf, value);
    }

    fn append_complex128(&mut self, re: f64, im: f64) {
        append_float_text(self.buf, re);
        self.buf.append_byte(b'+');
        append_float_text(self.buf, im);
        self.buf.append_byte(b'i');
    }

    fn append_complex64(&mut self, re: f32, im: f32) {
        append_float32_text(self.buf, re);
        self.buf.append_byte(b'+');
        append_float32_text(self.buf, im);
        self.buf.append_byte(b'i');
    }

    fn append_str(&mut self, value: &str) {
        self.buf.append_str(value);
    }

    fn append_byte_string(&mut self, value: &[u8]) {
        for chunk in value.utf8_chunks() {
            self.buf.append_str(chunk.valid());
            for _ in chunk.invalid() {
                self.buf.append_str("\u{fffd}");
            }
        }
    }
}

fn space_if_needed(buf: &mut Buffer) {
    if !buf.is_empty() && buf.last() != Some(b' ') {
        buf.append_byte(b' ');
    }
}

fn tab_if_needed(buf: &mut Buffer) {
    if !buf.is_empty() {
        buf.append_byte(b'\t');
    }
}

fn append_non_finite(buf: &mut Buffer, value: f64) {
    if value.is_nan() {
        buf.append_str("NaN");
    } else if value.is_sign_positive() {
        buf.append_str("+Inf");
    } else {
        buf.append_str("-Inf");
    }
}

fn append_float_text(buf: &mut Buffer, value: f64) {
    if value.is_finite() {
        buf.append_f64(value);
    } else {
        append_non_finite(buf, value);
    }
}

fn append_float32_text(buf: &mut Buffer, value: f32) {
    if value.is_finite() {
        buf.append_f32(value);
    } else {
        append_non_finite(buf, f64::from(value));
    }
}

/// JSON-escape a string into the buffer, without surrounding quotes
///
/// Only the characters JSON requires are escaped; everything else,
/// including non-ASCII text, is copied through unchanged.
pub(crate) fn escape_str(buf: &mut Buffer, s: &str) {
    let bytes = s.as_bytes();
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        let escaped: &[u8] = match b {
            b'"' => b"\\\"",
            b'\\' => b"\\\\",
            b'\n' => b"\\n",
            b'\r' => b"\\r",
            b'\t' => b"\\t",
            0x00..=0x1f => {
                buf.append_bytes(&bytes[start..i]);
                buf.append_bytes(b"\\u00");
                buf.append_byte(HEX[usize::from(b >> 4)]);
                buf.append_byte(HEX[usize::from(b & 0x0f)]);
                start = i + 1;
                continue;
            }
            _ => continue,
        };
        buf.append_bytes(&bytes[start..i]);
        buf.append_bytes(escaped);
        start = i + 1;
    }

    buf.append_bytes(&bytes[start..]);
}

/// Like [`escape_str`], replacing every invalid UTF-8 byte with `�`
pub(crate) fn escape_bytes(buf: &mut Buffer, bytes: &[u8]) {
    for chunk in bytes.utf8_chunks() {
        escape_str(buf, chunk.valid());
        for _ in chunk.invalid() {
            buf.append_str("\\ufffd");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldValue;
    use crate::core::log_entry::Caller;
    use crate::core::log_level::LogLevel;
    use crate::encoder::config::{DurationEncoding, TimeEncoding};

    const TS: &str = "2024-01-02T03:04:05.678Z";

    fn timestamp() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_704_164_645_678).unwrap()
    }

    fn entry(message: &str) -> LogEntry {
        LogEntry::new(LogLevel::Info, message)
            .with_logger_name("audit")
            .with_timestamp(timestamp())
    }

    fn mixed() -> MixedEncoder {
        MixedEncoder::new(EncoderConfig::new(TimeEncoding::Iso8601, DurationEncoding::Seconds))
    }

    fn render(enc: &MixedEncoder, entry: &LogEntry, fields: &[Field]) -> String {
        let buf = enc.encode_entry(entry, fields).unwrap();
        let line = buf.to_string();
        buf.release();
        line
    }

    /// The JSON object at the end of a mixed line
    fn json_part(line: &str) -> serde_json::Value {
        let start = line.find('{').unwrap();
        serde_json::from_str(line[start..].trim_end()).unwrap()
    }

    struct Broken;

    impl ObjectMarshaler for Broken {
        fn marshal_object(&self, enc: &mut dyn ObjectEncoder) -> Result<()> {
            enc.add_str("partial", "x");
            Err(LoggerError::encoder("object", "broken"))
        }
    }

    #[test]
    fn test_mixed_line_shape() {
        let line = render(&mixed(), &entry("login ok"), &[]);
        assert_eq!(line, format!("[{}] INFO [audit] login ok {{}}\n", TS));
    }

    #[test]
    fn test_mixed_without_name() {
        let entry = LogEntry::new(LogLevel::Warn, "low disk").with_timestamp(timestamp());
        let line = render(&mixed(), &entry, &[Field::new("free_mb", 12u32)]);
        assert_eq!(line, format!("[{}] WARN low disk {{\"free_mb\":12}}\n", TS));
    }

    #[test]
    fn test_mixed_caller_is_not_double_spaced() {
        let entry = entry("login ok").with_caller(Caller::new("src/core/auth.rs", 42));
        let line = render(&mixed(), &entry, &[]);
        assert_eq!(line, format!("[{}] INFO [audit] core/auth.rs:42 login ok {{}}\n", TS));
    }

    #[test]
    fn test_mixed_message_is_verbatim() {
        let line = render(&mixed(), &entry("hello "), &[]);
        assert_eq!(line, format!("[{}] INFO [audit] hello  {{}}\n", TS));

        let entry = entry(" padded ").with_caller(Caller::new("main.rs", 7));
        let line = render(&mixed(), &entry, &[]);
        assert_eq!(line, format!("[{}] INFO [audit] main.rs:7  padded  {{}}\n", TS));
    }

    #[test]
    fn test_mixed_empty_message() {
        let entry = entry("").with_caller(Caller::new("main.rs", 1));
        let line = render(&mixed(), &entry, &[]);
        assert_eq!(line, format!("[{}] INFO [audit] main.rs:1 {{}}\n", TS));
    }

    #[test]
    fn test_disabled_keys_drop_sections() {
        let config = EncoderConfig::new(TimeEncoding::Iso8601, DurationEncoding::Seconds)
            .with_time_key("")
            .with_name_key("");
        let line = render(&MixedEncoder::new(config), &entry("hello"), &[]);
        assert_eq!(line, "INFO hello {}\n");
    }

    #[test]
    fn test_iso_timestamps_are_utc() {
        let local = DateTime::parse_from_rfc3339("2024-01-02T06:04:05.678+03:00").unwrap();
        let entry = entry("x").with_timestamp(local.with_timezone(&Utc));
        let line = render(&mixed(), &entry, &[]);
        assert!(line.starts_with(&format!("[{}] INFO", TS)), "{}", line);
    }

    #[test]
    fn test_epoch_millis_prefix() {
        let config = EncoderConfig::new(TimeEncoding::EpochMillis, DurationEncoding::Seconds);
        let line = render(&MixedEncoder::new(config), &entry("x"), &[]);
        assert!(line.starts_with("[1704164645678] INFO"));
    }

    #[test]
    fn test_context_precedes_entry_fields() {
        let mut enc = mixed();
        enc.add_str("svc", "api");
        let line = render(&enc, &entry("login ok"), &[Field::new("user", "bob")]);
        assert!(line.ends_with(" login ok {\"svc\":\"api\",\"user\":\"bob\"}\n"));

        let line = render(&enc, &entry("again"), &[]);
        assert!(line.ends_with(" again {\"svc\":\"api\"}\n"));
    }

    #[test]
    fn test_namespaces_close_before_stacktrace() {
        let entry = entry("failed").with_stack("frame 0\nframe 1");
        let fields = [Field::namespace("req"), Field::new("id", 7i64)];
        let line = render(&mixed(), &entry, &fields);
        assert!(line.ends_with(
            " failed {\"req\":{\"id\":7},\"stacktrace\":\"frame 0\\nframe 1\"}\n"
        ));
    }

    #[test]
    fn test_context_namespace_stays_open_for_entry_fields() {
        let mut enc = mixed();
        enc.open_namespace("ctx");
        enc.add_i64("a", 1);
        let line = render(&enc, &entry("m"), &[Field::new("b", 2i64)]);
        assert!(line.ends_with(" m {\"ctx\":{\"a\":1,\"b\":2}}\n"));
    }

    #[test]
    fn test_float_rendering() {
        let fields = [
            Field::new("nan", f64::NAN),
            Field::new("pos", f64::INFINITY),
            Field::new("neg", f64::NEG_INFINITY),
            Field::new("half", 1.5f64),
            Field::new("single", 0.1f32),
            Field::new("big", 1e21f64),
        ];
        let line = render(&mixed(), &entry("m"), &fields);
        assert!(line.ends_with(
            " m {\"nan\":\"NaN\",\"pos\":\"+Inf\",\"neg\":\"-Inf\",\"half\":1.5,\"single\":0.1,\"big\":1000000000000000000000}\n"
        ));
    }

    #[test]
    fn test_complex_rendering() {
        let fields = [Field::complex("c", 1.5, -2.0), Field::complex64("c32", 0.5, 1.0)];
        let line = render(&mixed(), &entry("m"), &fields);
        assert!(line.ends_with(" m {\"c\":\"1.5+-2i\",\"c32\":\"0.5+1i\"}\n"));
    }

    #[test]
    fn test_string_escaping() {
        let fields = [Field::new("s", "a\"b\\c\nd\re\tf\u{1}g")];
        let line = render(&mixed(), &entry("m"), &fields);
        assert!(line.ends_with(" m {\"s\":\"a\\\"b\\\\c\\nd\\re\\tf\\u0001g\"}\n"));
        assert_eq!(json_part(&line)["s"], "a\"b\\c\nd\re\tf\u{1}g");
    }

    #[test]
    fn test_invalid_utf8_bytes_become_replacement_chars() {
        let fields = [Field::byte_string("b", b"ok\xff\xfex".to_vec())];
        let line = render(&mixed(), &entry("m"), &fields);
        assert!(line.ends_with(" m {\"b\":\"ok\\ufffd\\ufffdx\"}\n"));
        assert_eq!(json_part(&line)["b"], "ok\u{fffd}\u{fffd}x");
    }

    #[test]
    fn test_binary_is_base64() {
        let line = render(&mixed(), &entry("m"), &[Field::binary("blob", b"hello".to_vec())]);
        assert!(line.ends_with(" m {\"blob\":\"aGVsbG8=\"}\n"));
    }

    #[test]
    fn test_duration_encodings() {
        let d = Duration::from_millis(1500);
        for (encoding, expected) in [
            (DurationEncoding::Seconds, "1.5"),
            (DurationEncoding::Nanos, "1500000000"),
            (DurationEncoding::String, "\"1.5s\""),
        ] {
            let enc = MixedEncoder::new(EncoderConfig::new(TimeEncoding::Iso8601, encoding));
            let line = render(&enc, &entry("m"), &[Field::new("took", d)]);
            assert!(
                line.ends_with(&format!(" m {{\"took\":{}}}\n", expected)),
                "{:?}: {}",
                encoding,
                line
            );
        }
    }

    #[test]
    fn test_time_field_uses_time_encoder() {
        let line = render(&mixed(), &entry("m"), &[Field::new("at", timestamp())]);
        assert!(line.ends_with(&format!(" m {{\"at\":\"{}\"}}\n", TS)));
    }

    #[test]
    fn test_noop_encoders_fall_back_to_nanos() {
        let config = EncoderConfig::new(TimeEncoding::Iso8601, DurationEncoding::Seconds)
            .with_time_encoder(|_, _| {})
            .with_duration_encoder(|_, _| {});
        let enc = MixedEncoder::json(config);
        let fields = [
            Field::new("at", timestamp()),
            Field::new("took", Duration::from_micros(3)),
        ];
        let line = render(&enc, &entry("m"), &fields);
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["at"], 1_704_164_645_678_000_000i64);
        assert_eq!(value["timestamp"], 1_704_164_645_678_000_000i64);
        assert_eq!(value["took"], 3000);
    }

    #[test]
    fn test_failed_object_reports_error_field() {
        let line = render(&mixed(), &entry("m"), &[Field::object("obj", Broken)]);
        assert!(line.ends_with(
            " m {\"obj\":{\"partial\":\"x\"},\"objError\":\"Encoder error (object): broken\"}\n"
        ));
    }

    #[test]
    fn test_nested_object_and_array() {
        let fields = [
            Field::object("user", vec![Field::new("id", 1u64), Field::new("admin", false)]),
            Field::array(
                "tags",
                vec![FieldValue::from("a"), FieldValue::from(2i32), FieldValue::Float64(0.5)],
            ),
        ];
        let line = render(&mixed(), &entry("m"), &fields);
        assert!(line.ends_with(
            " m {\"user\":{\"id\":1,\"admin\":false},\"tags\":[\"a\",2,0.5]}\n"
        ));
    }

    #[test]
    fn test_reflected_value() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("k", vec![1, 2]);
        let line = render(&mixed(), &entry("m"), &[Field::reflected("r", map)]);
        assert!(line.ends_with(" m {\"r\":{\"k\":[1,2]}}\n"));
    }

    #[test]
    fn test_spaced_output() {
        let enc = mixed().with_spacing(true);
        let fields = [Field::new("a", 1i64), Field::new("b", 2i64)];
        let line = render(&enc, &entry("m"), &fields);
        assert!(line.ends_with(" m {\"a\": 1, \"b\": 2}\n"));
    }

    #[test]
    fn test_json_layout() {
        let enc = MixedEncoder::json(EncoderConfig::new(
            TimeEncoding::Iso8601,
            DurationEncoding::Seconds,
        ));
        let entry = entry("login ok").with_caller(Caller::new("src/auth.rs", 9));
        let line = render(&enc, &entry, &[Field::new("user", "bob")]);
        assert_eq!(
            line,
            format!(
                "{{\"level\":\"INFO\",\"timestamp\":\"{}\",\"name\":\"audit\",\"caller\":\"src/auth.rs:9\",\"message\":\"login ok\",\"user\":\"bob\"}}\n",
                TS
            )
        );
    }

    #[test]
    fn test_console_layout() {
        let enc = MixedEncoder::console(EncoderConfig::new(
            TimeEncoding::Iso8601,
            DurationEncoding::Seconds,
        ));
        let line = render(&enc, &entry("login ok"), &[Field::new("user", "bob")]);
        assert_eq!(line, format!("{}\tINFO\taudit\tlogin ok\t{{\"user\":\"bob\"}}\n", TS));

        let line = render(&enc, &entry("login ok").with_stack("frame"), &[]);
        assert_eq!(line, format!("{}\tINFO\taudit\tlogin ok\nframe\n", TS));
    }

    #[test]
    fn test_clone_carries_context() {
        let mut enc = mixed();
        enc.add_str("svc", "api");
        let clone = enc.clone_encoder();
        enc.add_str("extra", "only-original");

        let line = render_dyn(clone.as_ref(), &entry("m"));
        assert!(line.ends_with(" m {\"svc\":\"api\"}\n"));
    }

    fn render_dyn(enc: &dyn Encoder, entry: &LogEntry) -> String {
        let buf = enc.encode_entry(entry, &[]).unwrap();
        buf.to_string()
    }
}
