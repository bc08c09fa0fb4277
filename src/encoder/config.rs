//! Encoder configuration
//!
//! Output keys and the pluggable functions used to render timestamps,
//! durations, levels and call sites.

use super::PrimitiveEncoder;
use crate::core::error::LoggerError;
use crate::core::log_entry::Caller;
use crate::core::log_level::LogLevel;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub type TimeEncoderFn = Arc<dyn Fn(DateTime<Utc>, &mut dyn PrimitiveEncoder) + Send + Sync>;
pub type DurationEncoderFn = Arc<dyn Fn(Duration, &mut dyn PrimitiveEncoder) + Send + Sync>;
pub type LevelEncoderFn = Arc<dyn Fn(LogLevel, &mut dyn PrimitiveEncoder) + Send + Sync>;
pub type CallerEncoderFn = Arc<dyn Fn(&Caller, &mut dyn PrimitiveEncoder) + Send + Sync>;

/// How entry timestamps and time fields are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeEncoding {
    /// `2025-01-08T10:30:45.123Z`, always in UTC
    #[default]
    Iso8601,
    /// Float seconds since the epoch: `1736332245.123`
    Epoch,
    /// Integer milliseconds since the epoch
    #[serde(rename = "millis")]
    EpochMillis,
    /// Integer nanoseconds since the epoch
    #[serde(rename = "nanos")]
    EpochNanos,
}

impl TimeEncoding {
    pub fn encode(&self, time: DateTime<Utc>, enc: &mut dyn PrimitiveEncoder) {
        match self {
            TimeEncoding::Iso8601 => {
                enc.append_str(&time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
            }
            TimeEncoding::Epoch => {
                let nanos = epoch_nanos(time);
                enc.append_f64(nanos as f64 / 1_000_000_000.0)
            }
            TimeEncoding::EpochMillis => enc.append_i64(time.timestamp_millis()),
            TimeEncoding::EpochNanos => enc.append_i64(epoch_nanos(time)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeEncoding::Iso8601 => "iso8601",
            TimeEncoding::Epoch => "epoch",
            TimeEncoding::EpochMillis => "millis",
            TimeEncoding::EpochNanos => "nanos",
        }
    }
}

impl FromStr for TimeEncoding {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "iso8601" | "" => Ok(TimeEncoding::Iso8601),
            "epoch" => Ok(TimeEncoding::Epoch),
            "millis" => Ok(TimeEncoding::EpochMillis),
            "nanos" => Ok(TimeEncoding::EpochNanos),
            _ => Err(LoggerError::config(
                "encoding-time",
                format!("unknown time encoding {:?}", s),
            )),
        }
    }
}

/// Epoch nanoseconds, saturating outside the representable range
pub(crate) fn epoch_nanos(time: DateTime<Utc>) -> i64 {
    time.timestamp_nanos_opt().unwrap_or_else(|| {
        if time.timestamp() < 0 {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

/// How duration fields are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationEncoding {
    /// Float seconds
    #[default]
    Seconds,
    /// Integer nanoseconds
    Nanos,
    /// Human readable, e.g. `1.5s`
    String,
}

impl DurationEncoding {
    pub fn encode(&self, duration: Duration, enc: &mut dyn PrimitiveEncoder) {
        match self {
            DurationEncoding::Seconds => enc.append_f64(duration.as_secs_f64()),
            DurationEncoding::Nanos => {
                enc.append_i64(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
            }
            DurationEncoding::String => enc.append_str(&format!("{:?}", duration)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DurationEncoding::Seconds => "seconds",
            DurationEncoding::Nanos => "nanos",
            DurationEncoding::String => "string",
        }
    }
}

impl FromStr for DurationEncoding {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "seconds" | "" => Ok(DurationEncoding::Seconds),
            "nanos" => Ok(DurationEncoding::Nanos),
            "string" => Ok(DurationEncoding::String),
            _ => Err(LoggerError::config(
                "encoding-duration",
                format!("unknown duration encoding {:?}", s),
            )),
        }
    }
}

/// Overall line shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `{"level":"INFO","timestamp":...,"message":...}`
    #[default]
    Json,
    /// Tab-separated prefix followed by a JSON object of fields
    Console,
    /// `[time] LEVEL [name] caller message {fields}`
    Mixed,
}

impl Layout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layout::Json => "json",
            Layout::Console => "console",
            Layout::Mixed => "mixed",
        }
    }
}

impl FromStr for Layout {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" | "" => Ok(Layout::Json),
            "console" => Ok(Layout::Console),
            "mixed" => Ok(Layout::Mixed),
            _ => Err(LoggerError::config(
                "encoding",
                format!("unknown encoding {:?}", s),
            )),
        }
    }
}

/// Output keys and rendering functions shared by every clone of an encoder
///
/// An empty key disables the corresponding section of the line.
#[derive(Clone, Default)]
pub struct EncoderConfig {
    pub message_key: String,
    pub level_key: String,
    pub time_key: String,
    pub name_key: String,
    pub caller_key: String,
    pub stacktrace_key: String,
    pub encode_time: Option<TimeEncoderFn>,
    pub encode_duration: Option<DurationEncoderFn>,
    pub encode_level: Option<LevelEncoderFn>,
    pub encode_caller: Option<CallerEncoderFn>,
}

static EMPTY: Lazy<Arc<EncoderConfig>> = Lazy::new(|| Arc::new(EncoderConfig::default()));

impl EncoderConfig {
    /// Shared config with no keys and no rendering functions
    pub fn empty() -> Arc<EncoderConfig> {
        Arc::clone(&EMPTY)
    }

    /// Standard keys with the given time and duration encodings
    pub fn new(time: TimeEncoding, duration: DurationEncoding) -> Self {
        Self {
            message_key: "message".to_string(),
            level_key: "level".to_string(),
            time_key: "timestamp".to_string(),
            name_key: "name".to_string(),
            caller_key: "caller".to_string(),
            stacktrace_key: "stacktrace".to_string(),
            encode_time: Some(Arc::new(
                move |t: DateTime<Utc>, enc: &mut dyn PrimitiveEncoder| time.encode(t, enc),
            )),
            encode_duration: Some(Arc::new(
                move |d: Duration, enc: &mut dyn PrimitiveEncoder| duration.encode(d, enc),
            )),
            encode_level: Some(Arc::new(capital_level)),
            encode_caller: Some(Arc::new(short_caller)),
        }
    }

    #[must_use]
    pub fn with_message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = key.into();
        self
    }

    #[must_use]
    pub fn with_level_key(mut self, key: impl Into<String>) -> Self {
        self.level_key = key.into();
        self
    }

    #[must_use]
    pub fn with_time_key(mut self, key: impl Into<String>) -> Self {
        self.time_key = key.into();
        self
    }

    #[must_use]
    pub fn with_name_key(mut self, key: impl Into<String>) -> Self {
        self.name_key = key.into();
        self
    }

    #[must_use]
    pub fn with_caller_key(mut self, key: impl Into<String>) -> Self {
        self.caller_key = key.into();
        self
    }

    #[must_use]
    pub fn with_stacktrace_key(mut self, key: impl Into<String>) -> Self {
        self.stacktrace_key = key.into();
        self
    }

    #[must_use]
    pub fn with_time_encoder<F>(mut self, f: F) -> Self
    where
        F: Fn(DateTime<Utc>, &mut dyn PrimitiveEncoder) + Send + Sync + 'static,
    {
        self.encode_time = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_duration_encoder<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration, &mut dyn PrimitiveEncoder) + Send + Sync + 'static,
    {
        self.encode_duration = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_level_encoder<F>(mut self, f: F) -> Self
    where
        F: Fn(LogLevel, &mut dyn PrimitiveEncoder) + Send + Sync + 'static,
    {
        self.encode_level = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn with_caller_encoder<F>(mut self, f: F) -> Self
    where
        F: Fn(&Caller, &mut dyn PrimitiveEncoder) + Send + Sync + 'static,
    {
        self.encode_caller = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for EncoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderConfig")
            .field("message_key", &self.message_key)
            .field("level_key", &self.level_key)
            .field("time_key", &self.time_key)
            .field("name_key", &self.name_key)
            .field("caller_key", &self.caller_key)
            .field("stacktrace_key", &self.stacktrace_key)
            .field("encode_time", &self.encode_time.is_some())
            .field("encode_duration", &self.encode_duration.is_some())
            .field("encode_level", &self.encode_level.is_some())
            .field("encode_caller", &self.encode_caller.is_some())
            .finish()
    }
}

/// `INFO`, `WARN`, ...
pub fn capital_level(level: LogLevel, enc: &mut dyn PrimitiveEncoder) {
    enc.append_str(level.to_str());
}

/// `dir/file.rs:42`
pub fn short_caller(caller: &Caller, enc: &mut dyn PrimitiveEncoder) {
    enc.append_str(&caller.trimmed_path());
}
