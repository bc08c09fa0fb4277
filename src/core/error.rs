//! Error types for the log writer

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Logger name rejected by the allow-list
    #[error("unknown logger name {name:?}")]
    UnknownLogger { name: String },

    /// Destination string could not be parsed
    #[error("invalid destination {destination:?}: {message}")]
    InvalidDestination {
        destination: String,
        message: String,
    },

    /// No sink factory registered for the scheme
    #[error("unregistered sink scheme {scheme:?}")]
    UnregisteredScheme { scheme: String },

    /// Required destination parameter is absent
    #[error("{scheme}: parameter {key:?} is required")]
    MissingParameter { scheme: String, key: String },

    /// Destination parameter present but unusable
    #[error("invalid value {value:?} for parameter {key:?}: {message}")]
    InvalidParameter {
        key: String,
        value: String,
        message: String,
    },

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSinkError { path: String, message: String },

    /// Write attempted on a sink that was already closed
    #[error("sink {destination:?} is closed")]
    SinkClosed { destination: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Encoder error with encoding name
    #[error("Encoder error ({encoding}): {message}")]
    EncoderError { encoding: String, message: String },
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn unknown_logger(name: impl Into<String>) -> Self {
        LoggerError::UnknownLogger { name: name.into() }
    }

    /// Create a destination parse error
    pub fn destination(destination: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidDestination {
            destination: destination.into(),
            message: message.into(),
        }
    }

    pub fn unregistered_scheme(scheme: impl Into<String>) -> Self {
        LoggerError::UnregisteredScheme {
            scheme: scheme.into(),
        }
    }

    pub fn missing_parameter(scheme: impl Into<String>, key: impl Into<String>) -> Self {
        LoggerError::MissingParameter {
            scheme: scheme.into(),
            key: key.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(
        key: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        LoggerError::InvalidParameter {
            key: key.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSinkError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn sink_closed(destination: impl Into<String>) -> Self {
        LoggerError::SinkClosed {
            destination: destination.into(),
        }
    }

    /// Create an encoder error
    pub fn encoder(encoding: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::EncoderError {
            encoding: encoding.into(),
            message: message.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Whether this error was raised while validating configuration,
    /// i.e. before any destination was opened.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LoggerError::InvalidConfiguration { .. }
                | LoggerError::UnknownLogger { .. }
                | LoggerError::InvalidDestination { .. }
                | LoggerError::UnregisteredScheme { .. }
                | LoggerError::MissingParameter { .. }
                | LoggerError::InvalidParameter { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LoggerError::config("encoding", "unknown encoding \"protobuf\"");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
        assert!(err.is_configuration());

        let err = LoggerError::file_sink("/var/log/app.log", "Permission denied");
        assert!(matches!(err, LoggerError::FileSinkError { .. }));
        assert!(!err.is_configuration());

        let err = LoggerError::missing_parameter("tcp", "port");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::unknown_logger("carbonserver");
        assert_eq!(err.to_string(), "unknown logger name \"carbonserver\"");

        let err = LoggerError::unregistered_scheme("kafka");
        assert_eq!(err.to_string(), "unregistered sink scheme \"kafka\"");

        let err = LoggerError::invalid_parameter("timeout-ms", "abc", "not an integer");
        assert_eq!(
            err.to_string(),
            "invalid value \"abc\" for parameter \"timeout-ms\": not an integer"
        );

        let err = LoggerError::sink_closed("/tmp/app.log");
        assert_eq!(err.to_string(), "sink \"/tmp/app.log\" is closed");
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("opening log file", "cannot open /root/x.log", io_err);

        assert!(matches!(err, LoggerError::IoOperation { .. }));
        assert!(err.to_string().contains("opening log file"));
        assert!(err.to_string().contains("cannot open /root/x.log"));
    }
}
