//! Logging macros for ergonomic log message formatting.
//!
//! These macros format the message like `format!` and pass it to the
//! logger together with optional fields in brackets. Each returns the
//! logger's `Result<()>`.
//!
//! # Examples
//!
//! ```
//! use rust_log_writer::prelude::*;
//! use rust_log_writer::info;
//!
//! let logger = Logger::nop();
//!
//! // Basic logging
//! info!(logger, "Server started").unwrap();
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port).unwrap();
//!
//! // With fields
//! info!(logger, [Field::new("port", port)], "Server listening").unwrap();
//! ```

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use rust_log_writer::prelude::*;
/// # let logger = Logger::nop();
/// use rust_log_writer::log;
/// log!(logger, LogLevel::Info, "Simple message").unwrap();
/// log!(logger, LogLevel::Error, "Error code: {}", 500).unwrap();
/// log!(logger, LogLevel::Warn, [Field::new("retry", 3)], "Retrying {}", "upload").unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, [$($field:expr),* $(,)?], $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+), &[$($field),*])
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+), &[])
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use rust_log_writer::prelude::*;
/// # let logger = Logger::nop();
/// use rust_log_writer::info;
/// info!(logger, "Application started").unwrap();
/// info!(logger, "Processing {} items", 100).unwrap();
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use rust_log_writer::prelude::*;
/// # let logger = Logger::nop();
/// use rust_log_writer::error;
/// let err = std::io::Error::new(std::io::ErrorKind::Other, "refused");
/// error!(logger, [Field::error(&err)], "Upstream {} unavailable", "db").unwrap();
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Error, $($arg)+)
    };
}

/// Log a dpanic-level message. Does not panic.
#[macro_export]
macro_rules! dpanic {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::DPanic, $($arg)+)
    };
}

/// Log a fatal-level message. Does not exit.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::LogLevel::Fatal, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{AtomicLevel, Field, LogCore, LogLevel, Logger, Sink};
    use crate::encoder::{EncoderConfig, MixedEncoder};
    use crate::sinks::MemorySink;
    use std::sync::Arc;

    fn logger(sink: &Arc<MemorySink>) -> Logger {
        let config = EncoderConfig::default().with_message_key("message");
        let core = LogCore::new(
            Box::new(MixedEncoder::json(config)),
            Arc::clone(sink) as Arc<dyn Sink>,
            AtomicLevel::new(LogLevel::Debug),
        );
        Logger::new("", vec![Arc::new(core)])
    }

    #[test]
    fn test_format_and_fields() {
        let sink = Arc::new(MemorySink::new());
        let logger = logger(&sink);

        crate::info!(logger, "plain").unwrap();
        crate::warn!(logger, "count {}", 3).unwrap();
        crate::error!(logger, [Field::new("code", 500), Field::new("path", "/")], "failed {}", "GET")
            .unwrap();
        crate::debug!(logger, [], "no fields").unwrap();

        assert_eq!(
            sink.lines(),
            vec![
                r#"{"message":"plain"}"#,
                r#"{"message":"count 3"}"#,
                r#"{"message":"failed GET","code":500,"path":"/"}"#,
                r#"{"message":"no fields"}"#,
            ]
        );
    }

    #[test]
    fn test_severe_levels_do_not_terminate() {
        let sink = Arc::new(MemorySink::new());
        let logger = logger(&sink);

        crate::dpanic!(logger, "dpanic").unwrap();
        crate::fatal!(logger, "fatal").unwrap();
        assert_eq!(sink.lines().len(), 2);
    }
}
