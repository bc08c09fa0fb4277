//! # Rust Log Writer
//!
//! Configuration-driven output pipeline for structured logs.
//!
//! ## Features
//!
//! - **Mixed encoder**: `[time] LEVEL [name] caller message {fields}` lines,
//!   plus JSON and console layouts
//! - **Rotation-aware files**: reopens the path after logrotate moves or
//!   deletes the file
//! - **Destination strings**: `file`, `tcp`, `mqtt` (feature `mqtt`), `stdout`,
//!   `stderr`, `none`, and third-party schemes through the sink registry
//! - **Named loggers**: entries with the same name fan out to every
//!   configured output; equal destinations share one sink
//!
//! ## Example
//!
//! ```no_run
//! use rust_log_writer::prelude::*;
//!
//! let manager = Manager::new(&[
//!     LoggerConfig::new("").with_destination("/var/log/app/app.log?level=debug"),
//!     LoggerConfig::new("audit")
//!         .with_destination("/var/log/app/audit.log")
//!         .with_encoding("mixed"),
//! ])
//! .expect("Invalid logging configuration");
//!
//! let audit = manager.logger("audit");
//! audit.info("login ok", &[Field::new("user", "alice")]).unwrap();
//! ```

pub mod core;
pub mod encoder;
pub mod global;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        AtomicLevel, Dsn, EntryBuilder, Field, FieldValue, LogCore, LogEntry, LogLevel, Logger,
        LoggerConfig, LoggerError, LoggerMetrics, Manager, Result, Sink,
    };
    pub use crate::encoder::{DurationEncoding, EncoderConfig, Layout, MixedEncoder, TimeEncoding};
    pub use crate::sinks::{FileSink, SinkFactory, SinkRegistry};
}

pub use crate::core::{
    AtomicLevel, Dsn, Field, FieldValue, LogLevel, Logger, LoggerConfig, LoggerError,
    LoggerMetrics, Manager, Result, Sink,
};
pub use encoder::{Layout, MixedEncoder};
pub use sinks::{SinkFactory, SinkRegistry};
