//! TCP sink for remote log collectors
//!
//! Destination form: `tcp://host:port?timeout-ms=5000&nodelay=true&reconnect=true`.
//! Each encoded line is written to the stream as-is.

use super::registry::SinkFactory;
use crate::core::{Dsn, LoggerError, Result, Sink};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const SCHEME: &str = "tcp";
pub const DEFAULT_TIMEOUT_MS: i64 = 5000;

/// Connection options of a TCP sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpOptions {
    pub address: String,
    pub timeout: Duration,
    pub nodelay: bool,
    pub reconnect: bool,
}

impl TcpOptions {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS as u64),
            nodelay: true,
            reconnect: true,
        }
    }

    /// Read and validate options from a `tcp://` destination
    pub fn from_dsn(dsn: &Dsn) -> Result<Self> {
        let host = dsn.host();
        if host.is_empty() {
            return Err(LoggerError::missing_parameter(SCHEME, "host"));
        }
        if dsn.url().and_then(|url| url.port()).is_none() {
            return Err(LoggerError::missing_parameter(SCHEME, "port"));
        }

        let params = dsn.params();
        let timeout_ms = params.int("timeout-ms", DEFAULT_TIMEOUT_MS)?;
        if timeout_ms <= 0 {
            return Err(LoggerError::invalid_parameter(
                "timeout-ms",
                timeout_ms.to_string(),
                "must be greater than zero",
            ));
        }

        Ok(Self {
            address: host.to_string(),
            timeout: Duration::from_millis(timeout_ms as u64),
            nodelay: params.bool("nodelay", true)?,
            reconnect: params.bool("reconnect", true)?,
        })
    }
}

/// Sink that sends log lines to a remote TCP server
///
/// # Example
///
/// ```no_run
/// use rust_log_writer::sinks::tcp::{TcpOptions, TcpSink};
/// use rust_log_writer::core::Sink;
///
/// let sink = TcpSink::connect(TcpOptions::new("127.0.0.1:5140"))
///     .expect("Failed to connect to log collector");
/// sink.write(b"hello\n").unwrap();
/// ```
pub struct TcpSink {
    options: TcpOptions,
    stream: Mutex<Option<TcpStream>>,
    closed: AtomicBool,
}

impl TcpSink {
    /// Connect to the collector
    ///
    /// # Errors
    ///
    /// Returns error if the address does not resolve or the connection fails
    pub fn connect(options: TcpOptions) -> Result<Self> {
        let stream = Self::dial(&options)?;
        Ok(Self {
            options,
            stream: Mutex::new(Some(stream)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn options(&self) -> &TcpOptions {
        &self.options
    }

    pub fn is_connected(&self) -> bool {
        self.stream.lock().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn dial(options: &TcpOptions) -> Result<TcpStream> {
        let addrs: Vec<SocketAddr> = options
            .address
            .to_socket_addrs()
            .map_err(|e| {
                LoggerError::io_operation(
                    "resolving log collector",
                    format!("cannot resolve {}", options.address),
                    e,
                )
            })?
            .collect();

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, options.timeout) {
                Ok(stream) => {
                    stream.set_write_timeout(Some(options.timeout))?;
                    stream.set_nodelay(options.nodelay)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(match last_err {
            Some(e) => LoggerError::io_operation(
                "connecting to log collector",
                format!("cannot connect to {}", options.address),
                e,
            ),
            None => LoggerError::destination(&options.address, "address resolved to nothing"),
        })
    }
}

impl Sink for TcpSink {
    fn write(&self, bytes: &[u8]) -> Result<usize> {
        let mut guard = self.stream.lock();
        // close() flips the flag under the same lock
        if self.is_closed() {
            return Err(LoggerError::sink_closed(&self.options.address));
        }

        let first = match guard.as_mut() {
            Some(stream) => stream.write_all(bytes),
            None if self.options.reconnect => {
                let mut stream = Self::dial(&self.options)?;
                let result = stream.write_all(bytes);
                *guard = Some(stream);
                result
            }
            None => return Err(LoggerError::writer("Network stream not connected")),
        };

        match first {
            Ok(()) => Ok(bytes.len()),
            Err(e) => {
                // Connection lost
                *guard = None;

                if !self.options.reconnect {
                    return Err(e.into());
                }

                // Reconnect once and resend the line.
                match Self::dial(&self.options) {
                    Ok(mut stream) => {
                        stream.write_all(bytes)?;
                        *guard = Some(stream);
                        Ok(bytes.len())
                    }
                    Err(reconnect_err) => Err(LoggerError::writer(format!(
                        "Failed to send log and reconnect: {} (reconnect: {})",
                        e, reconnect_err
                    ))),
                }
            }
        }
    }

    fn sync(&self) -> Result<()> {
        if let Some(stream) = self.stream.lock().as_mut() {
            stream.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut guard = self.stream.lock();
        self.closed.store(true, Ordering::Release);
        if let Some(mut stream) = guard.take() {
            let _ = stream.flush();
            let _ = stream.shutdown(Shutdown::Both);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.options.address
    }
}

impl Drop for TcpSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Factory for `tcp://` destinations
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpSinkFactory;

impl SinkFactory for TcpSinkFactory {
    fn validate(&self, dsn: &Dsn) -> Result<()> {
        TcpOptions::from_dsn(dsn).map(|_| ())
    }

    fn open(&self, dsn: &Dsn) -> Result<Arc<dyn Sink>> {
        Ok(Arc::new(TcpSink::connect(TcpOptions::from_dsn(dsn)?)?))
    }
}
