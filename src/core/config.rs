//! Per-logger configuration entries
//!
//! One [`LoggerConfig`] describes one output of one named logger. Several
//! entries may share a logger name (the logger fans out to all of them)
//! and several may share a destination (they share one sink).
//!
//! The destination's query string may override the entry's fields:
//!
//! ```text
//! /var/log/app.log?level=debug&encoding=mixed&encoding-time=millis
//! ```

use super::dsn::Dsn;
use super::error::Result;
use super::log_core::LogCore;
use super::log_level::{AtomicLevel, LogLevel};
use super::logger::Logger;
use crate::encoder::{DurationEncoding, Encoder, EncoderConfig, Layout, MixedEncoder, TimeEncoding};
use crate::sinks::SinkRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One output of a named logger
///
/// # Example
///
/// ```
/// use rust_log_writer::core::LoggerConfig;
///
/// let config: LoggerConfig = serde_json::from_str(
///     r#"{"logger": "access", "file": "stdout", "encoding": "console"}"#,
/// ).unwrap();
/// assert_eq!(config.destination, "stdout");
/// assert_eq!(config.level, "info");
/// config.check().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggerConfig {
    /// Logger name; empty for the default logger
    pub logger: String,
    #[serde(alias = "file")]
    pub destination: String,
    pub level: String,
    pub encoding: String,
    pub encoding_time: String,
    pub encoding_duration: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            logger: String::new(),
            destination: "stderr".to_string(),
            level: LogLevel::Info.as_config_str().to_string(),
            encoding: Layout::Json.as_str().to_string(),
            encoding_time: TimeEncoding::Iso8601.as_str().to_string(),
            encoding_duration: DurationEncoding::Seconds.as_str().to_string(),
        }
    }
}

/// A configuration entry with every name parsed
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub logger: String,
    pub dsn: Dsn,
    pub level: LogLevel,
    pub layout: Layout,
    pub time: TimeEncoding,
    pub duration: DurationEncoding,
}

impl ResolvedConfig {
    pub fn encoder(&self) -> Box<dyn Encoder> {
        Box::new(MixedEncoder::with_layout(
            EncoderConfig::new(self.time, self.duration),
            self.layout,
        ))
    }
}

impl LoggerConfig {
    pub fn new(logger: impl Into<String>) -> Self {
        Self {
            logger: logger.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    #[must_use]
    pub fn with_encoding_time(mut self, encoding: impl Into<String>) -> Self {
        self.encoding_time = encoding.into();
        self
    }

    #[must_use]
    pub fn with_encoding_duration(mut self, encoding: impl Into<String>) -> Self {
        self.encoding_duration = encoding.into();
        self
    }

    /// Parse the destination and every name, applying query overrides
    ///
    /// # Errors
    ///
    /// Returns the first unparseable destination, level or encoding name
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let dsn = Dsn::parse(&self.destination)?;
        let params = dsn.params();

        let level = params
            .get("level")
            .unwrap_or(self.level.as_str())
            .parse::<LogLevel>()?;
        let layout = params
            .get("encoding")
            .unwrap_or(self.encoding.as_str())
            .parse::<Layout>()?;
        let time = params
            .get("encoding-time")
            .unwrap_or(self.encoding_time.as_str())
            .parse::<TimeEncoding>()?;
        let duration = params
            .get("encoding-duration")
            .unwrap_or(self.encoding_duration.as_str())
            .parse::<DurationEncoding>()?;

        Ok(ResolvedConfig {
            logger: self.logger.clone(),
            dsn,
            level,
            layout,
            time,
            duration,
        })
    }

    /// Encoder this entry would use
    pub fn encoder(&self) -> Result<Box<dyn Encoder>> {
        Ok(self.resolve()?.encoder())
    }

    /// Validate against the process-wide sink registry without opening anything
    pub fn check(&self) -> Result<()> {
        self.check_with(SinkRegistry::global())
    }

    pub fn check_with(&self, registry: &SinkRegistry) -> Result<()> {
        let resolved = self.resolve()?;
        registry.validate(&resolved.dsn)
    }

    /// Build a standalone logger for this entry alone
    ///
    /// The logger is unnamed regardless of `self.logger`. A `none`
    /// destination yields a no-op logger.
    pub fn build_logger(&self) -> Result<Logger> {
        self.build_logger_with(SinkRegistry::global())
    }

    pub fn build_logger_with(&self, registry: &SinkRegistry) -> Result<Logger> {
        let resolved = self.resolve()?;
        registry.validate(&resolved.dsn)?;
        if resolved.dsn.is_none() {
            return Ok(Logger::nop());
        }

        let sink = registry.open(&resolved.dsn)?;
        let core = LogCore::new(resolved.encoder(), sink, AtomicLevel::new(resolved.level));
        Ok(Logger::new("", vec![Arc::new(core)]))
    }
}
