//! Core logger types and traits

pub mod config;
pub mod dsn;
pub mod entry_builder;
pub mod error;
pub mod field;
pub mod log_core;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod manager;
pub mod metrics;
pub mod sink;

pub use config::{LoggerConfig, ResolvedConfig};
pub use dsn::{Dsn, DsnParams, Reserved, FILE_SCHEME};
pub use entry_builder::EntryBuilder;
pub use error::{LoggerError, Result};
pub use field::{Field, FieldValue, Reflect};
pub use log_core::LogCore;
pub use log_entry::{Caller, LogEntry};
pub use log_level::{AtomicLevel, LogLevel};
pub use logger::Logger;
pub use manager::{Manager, ManagerBuilder};
pub use metrics::LoggerMetrics;
pub use sink::Sink;
