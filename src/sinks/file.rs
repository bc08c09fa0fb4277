//! Rotation-aware file sink
//!
//! The sink never rotates files itself. When an external tool (logrotate,
//! an operator's `mv`) replaces or removes the file, the sink notices that
//! the open handle and the path no longer refer to the same file and
//! reopens the path. The check runs on every write and sync once the
//! check interval has passed, and from a background thread so that idle
//! sinks release rotated files too.

use crate::core::{LoggerError, Result, Sink};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Minimum time between two rotation checks
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// How often the background thread checks an idle sink
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

struct FileState {
    file: Option<File>,
    path: PathBuf,
    check_interval: Duration,
    check_next: Instant,
    reopens: u64,
}

impl FileState {
    fn check(&mut self) {
        let now = Instant::now();
        if now < self.check_next {
            return;
        }
        self.check_next = now + self.check_interval;

        let Some(file) = &self.file else {
            return;
        };

        let open_id = match file.metadata() {
            Ok(meta) => file_id(&meta),
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Cannot stat open log file {}: {}",
                    self.path.display(),
                    e
                );
                return;
            }
        };

        match fs::metadata(&self.path) {
            Ok(meta) if file_id(&meta) == open_id => {}
            Ok(_) => self.reopen(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => self.reopen(),
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Cannot stat log file path {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }

    fn reopen(&mut self) {
        match open_append(&self.path) {
            Ok(next) => {
                // The previous handle is closed when it is dropped here.
                self.file = Some(next);
                self.reopens += 1;
            }
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Failed to reopen log file {}: {}. Keeping the previous handle.",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

#[cfg(unix)]
fn file_id(meta: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_id(_meta: &Metadata) -> Option<(u64, u64)> {
    None
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Sink writing to a file that may be rotated underneath it
///
/// # Example
///
/// ```no_run
/// use rust_log_writer::sinks::FileSink;
/// use rust_log_writer::core::Sink;
///
/// let sink = FileSink::open("/var/log/app/app.log").unwrap();
/// sink.write(b"started\n").unwrap();
/// sink.close().unwrap();
/// ```
pub struct FileSink {
    path: PathBuf,
    display: String,
    state: Arc<Mutex<FileState>>,
    stop: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FileSink {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_intervals(path, DEFAULT_CHECK_INTERVAL, DEFAULT_POLL_INTERVAL)
    }

    /// Open with custom rotation check and background poll intervals
    pub fn with_intervals(
        path: impl Into<PathBuf>,
        check_interval: Duration,
        poll_interval: Duration,
    ) -> Result<Self> {
        let path = path.into();
        let display = path.display().to_string();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "creating log directory",
                        format!("cannot create {}", parent.display()),
                        e,
                    )
                })?;
            }
        }

        let file = open_append(&path).map_err(|e| {
            LoggerError::io_operation("opening log file", format!("cannot open {}", display), e)
        })?;

        let state = Arc::new(Mutex::new(FileState {
            file: Some(file),
            path: path.clone(),
            check_interval,
            check_next: Instant::now() + check_interval,
            reopens: 0,
        }));

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let checker_state = Arc::clone(&state);
        let worker = thread::Builder::new()
            .name("log-file-checker".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(poll_interval) {
                    Err(RecvTimeoutError::Timeout) => checker_state.lock().check(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| {
                LoggerError::io_operation(
                    "starting rotation checker",
                    format!("cannot spawn checker thread for {}", display),
                    e,
                )
            })?;

        Ok(Self {
            path,
            display,
            state,
            stop: Mutex::new(Some(stop_tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the file was reopened after rotation
    pub fn reopen_count(&self) -> u64 {
        self.state.lock().reopens
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().file.is_none()
    }
}

impl Sink for FileSink {
    fn write(&self, bytes: &[u8]) -> Result<usize> {
        let mut state = self.state.lock();
        state.check();

        let file = state
            .file
            .as_mut()
            .ok_or_else(|| LoggerError::sink_closed(&self.display))?;

        file.write_all(bytes).map_err(|e| {
            LoggerError::file_sink(&self.display, format!("Failed to write log entry: {}", e))
        })?;
        Ok(bytes.len())
    }

    fn sync(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.check();

        if let Some(file) = state.file.as_mut() {
            file.sync_all().map_err(|e| {
                LoggerError::file_sink(&self.display, format!("Failed to sync: {}", e))
            })?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        // Dropping the sender wakes the checker with `Disconnected`.
        drop(self.stop.lock().take());

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                eprintln!(
                    "[LOGGER ERROR] Rotation checker for {} panicked",
                    self.display
                );
            }
        }

        let file = self.state.lock().file.take();
        if let Some(file) = file {
            file.sync_all().map_err(|e| {
                LoggerError::file_sink(&self.display, format!("Failed to sync on close: {}", e))
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.display
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
