//! Scheme registry for sink factories
//!
//! Maps the scheme of a destination string to the factory that opens it.
//! `stderr`, `stdout` and `none` never reach a factory. Third-party sinks
//! register their scheme before any configuration is built; registering a
//! scheme twice replaces the earlier factory.

use super::discard::DiscardSink;
use super::file::FileSink;
use super::stream::StreamSink;
use crate::core::{Dsn, LoggerError, Reserved, Result, Sink, FILE_SCHEME};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Opens sinks for one destination scheme
pub trait SinkFactory: Send + Sync {
    /// Check the destination without opening anything
    fn validate(&self, _dsn: &Dsn) -> Result<()> {
        Ok(())
    }

    fn open(&self, dsn: &Dsn) -> Result<Arc<dyn Sink>>;
}

impl<F> SinkFactory for F
where
    F: Fn(&Dsn) -> Result<Arc<dyn Sink>> + Send + Sync,
{
    fn open(&self, dsn: &Dsn) -> Result<Arc<dyn Sink>> {
        self(dsn)
    }
}

/// Factory for `file://` destinations and plain paths
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSinkFactory;

impl SinkFactory for FileSinkFactory {
    fn validate(&self, dsn: &Dsn) -> Result<()> {
        dsn.file_path().map(|_| ())
    }

    fn open(&self, dsn: &Dsn) -> Result<Arc<dyn Sink>> {
        Ok(Arc::new(FileSink::open(dsn.file_path()?)?))
    }
}

static GLOBAL: Lazy<SinkRegistry> = Lazy::new(SinkRegistry::with_defaults);

/// Thread-safe table of scheme -> factory
pub struct SinkRegistry {
    factories: RwLock<HashMap<String, Arc<dyn SinkFactory>>>,
}

impl SinkRegistry {
    /// Registry without any factory; only reserved destinations open
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with the built-in `file` factory, plus `tcp` and `mqtt`
    /// when those features are enabled
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(FILE_SCHEME, FileSinkFactory);
        #[cfg(feature = "network")]
        registry.register(super::tcp::SCHEME, super::tcp::TcpSinkFactory);
        #[cfg(feature = "mqtt")]
        registry.register(super::mqtt::SCHEME, super::mqtt::MqttSinkFactory);
        registry
    }

    /// Process-wide registry used when no explicit registry is given
    pub fn global() -> &'static SinkRegistry {
        &GLOBAL
    }

    /// Register a factory for a scheme, replacing any earlier one
    pub fn register<F: SinkFactory + 'static>(&self, scheme: &str, factory: F) {
        self.factories
            .write()
            .insert(scheme.to_lowercase(), Arc::new(factory));
    }

    pub fn unregister(&self, scheme: &str) -> bool {
        self.factories.write().remove(&scheme.to_lowercase()).is_some()
    }

    pub fn is_registered(&self, scheme: &str) -> bool {
        self.factories.read().contains_key(&scheme.to_lowercase())
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.factories.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }

    fn factory(&self, scheme: &str) -> Result<Arc<dyn SinkFactory>> {
        self.factories
            .read()
            .get(scheme)
            .cloned()
            .ok_or_else(|| LoggerError::unregistered_scheme(scheme))
    }

    /// Check that a destination could be opened, without opening it
    pub fn validate(&self, dsn: &Dsn) -> Result<()> {
        if dsn.reserved().is_some() {
            return Ok(());
        }
        self.factory(dsn.scheme())?.validate(dsn)
    }

    pub fn open(&self, dsn: &Dsn) -> Result<Arc<dyn Sink>> {
        match dsn.reserved() {
            Some(Reserved::Stderr) => Ok(Arc::new(StreamSink::stderr())),
            Some(Reserved::Stdout) => Ok(Arc::new(StreamSink::stdout())),
            Some(Reserved::None) => Ok(Arc::new(DiscardSink)),
            None => {
                // Release the table lock before the factory does any I/O.
                let factory = self.factory(dsn.scheme())?;
                factory.open(dsn)
            }
        }
    }

    /// Parse a destination string and open it
    pub fn open_str(&self, destination: &str) -> Result<Arc<dyn Sink>> {
        self.open(&Dsn::parse(destination)?)
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
