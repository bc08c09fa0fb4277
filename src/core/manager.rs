//! Builds sinks, cores and named loggers from a configuration list
//!
//! Construction runs in two phases. The validation phase resolves every
//! entry (names, encodings, destination syntax, registered scheme and
//! factory parameters) without touching any destination; check-only mode
//! stops there. The build phase opens each distinct destination once and
//! groups cores by logger name. Any error aborts the whole build, and sinks
//! opened up to that point are released.

use super::config::{LoggerConfig, ResolvedConfig};
use super::error::{LoggerError, Result};
use super::log_core::LogCore;
use super::log_level::AtomicLevel;
use super::logger::Logger;
use super::sink::Sink;
use crate::sinks::SinkRegistry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Named loggers built from configuration
///
/// Immutable once built. Lookups never fail: an unknown name falls back to
/// the default (unnamed) logger, and a manager without a default logger
/// hands out a no-op logger.
///
/// # Example
///
/// ```
/// use rust_log_writer::core::{LoggerConfig, Manager};
///
/// let manager = Manager::new(&[
///     LoggerConfig::new("").with_destination("none"),
///     LoggerConfig::new("access").with_destination("stdout").with_encoding("mixed"),
/// ])
/// .unwrap();
///
/// assert!(manager.default_logger().is_nop());
/// assert!(!manager.logger("access").is_nop());
/// // Unknown names fall back to the default logger
/// assert!(manager.logger("jobs").is_nop());
/// ```
pub struct Manager {
    sinks: HashMap<String, Arc<dyn Sink>>,
    loggers: HashMap<String, Logger>,
    nop: Logger,
}

impl Manager {
    /// Build against the process-wide sink registry, with no name allow-list
    ///
    /// # Errors
    ///
    /// Returns the first configuration or resource error
    pub fn new(configs: &[LoggerConfig]) -> Result<Self> {
        Self::builder().build(configs)
    }

    /// Validate without opening any destination
    ///
    /// With `allow_names`, every entry's logger name must be in the list or
    /// empty.
    pub fn check(configs: &[LoggerConfig], allow_names: Option<&[&str]>) -> Result<()> {
        let mut builder = Self::builder();
        if let Some(names) = allow_names {
            builder = builder.allow_names(names.iter().copied());
        }
        builder.check(configs)
    }

    pub fn builder() -> ManagerBuilder<'static> {
        ManagerBuilder::new()
    }

    /// Manager without loggers; every lookup yields a no-op logger
    pub fn empty() -> Self {
        Self {
            sinks: HashMap::new(),
            loggers: HashMap::new(),
            nop: Logger::nop(),
        }
    }

    /// Logger for `name`, else the default logger, else a no-op logger
    pub fn logger(&self, name: &str) -> &Logger {
        self.loggers
            .get(name)
            .unwrap_or_else(|| self.default_logger())
    }

    pub fn default_logger(&self) -> &Logger {
        self.loggers.get("").unwrap_or(&self.nop)
    }

    /// Whether `name` was configured, as opposed to falling back
    pub fn has_logger(&self, name: &str) -> bool {
        self.loggers.contains_key(name)
    }

    /// Configured logger names, sorted
    pub fn logger_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.loggers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Shared sink for a destination key, e.g. `file:///var/log/app.log`
    pub fn sink(&self, destination_key: &str) -> Option<&Arc<dyn Sink>> {
        self.sinks.get(destination_key)
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Flush every sink, returning the first error
    pub fn sync(&self) -> Result<()> {
        self.for_each_sink("sync", |sink| sink.sync())
    }

    /// Close every sink, returning the first error
    ///
    /// Loggers handed out earlier keep working but their writes fail with
    /// [`LoggerError::SinkClosed`] for closable sinks.
    pub fn close(&self) -> Result<()> {
        self.for_each_sink("close", |sink| sink.close())
    }

    fn for_each_sink<F>(&self, action: &str, f: F) -> Result<()>
    where
        F: Fn(&dyn Sink) -> Result<()>,
    {
        let mut first_error = None;
        for (key, sink) in &self.sinks {
            if let Err(e) = f(sink.as_ref()) {
                eprintln!("[LOGGER ERROR] Failed to {} sink {}: {}", action, key, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sinks: Vec<&str> = self.sinks.keys().map(String::as_str).collect();
        sinks.sort_unstable();
        f.debug_struct("Manager")
            .field("sinks", &sinks)
            .field("loggers", &self.logger_names())
            .finish()
    }
}

/// Configures how a [`Manager`] is validated and built
pub struct ManagerBuilder<'a> {
    registry: &'a SinkRegistry,
    allow_names: Option<Vec<String>>,
}

impl ManagerBuilder<'static> {
    pub fn new() -> Self {
        Self {
            registry: SinkRegistry::global(),
            allow_names: None,
        }
    }
}

impl Default for ManagerBuilder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ManagerBuilder<'a> {
    /// Resolve schemes through `registry` instead of the process-wide one
    #[must_use]
    pub fn registry<'b>(self, registry: &'b SinkRegistry) -> ManagerBuilder<'b> {
        ManagerBuilder {
            registry,
            allow_names: self.allow_names,
        }
    }

    /// Reject entries whose logger name is neither empty nor listed
    #[must_use]
    pub fn allow_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Run the validation phase only
    pub fn check(&self, configs: &[LoggerConfig]) -> Result<()> {
        self.validate(configs).map(|_| ())
    }

    pub fn build(&self, configs: &[LoggerConfig]) -> Result<Manager> {
        let resolved = self.validate(configs)?;

        let mut sinks: HashMap<String, Arc<dyn Sink>> = HashMap::new();
        let mut groups: HashMap<String, Vec<Arc<LogCore>>> = HashMap::new();

        for config in resolved {
            let group = groups.entry(config.logger.clone()).or_default();
            if config.dsn.is_none() {
                continue;
            }

            let key = config.dsn.destination_key();
            let sink = match sinks.get(&key) {
                Some(sink) => Arc::clone(sink),
                None => {
                    let sink = self.registry.open(&config.dsn)?;
                    sinks.insert(key, Arc::clone(&sink));
                    sink
                }
            };

            group.push(Arc::new(LogCore::new(
                config.encoder(),
                sink,
                AtomicLevel::new(config.level),
            )));
        }

        let loggers = groups
            .into_iter()
            .map(|(name, cores)| (name.clone(), Logger::new(name, cores)))
            .collect();

        Ok(Manager {
            sinks,
            loggers,
            nop: Logger::nop(),
        })
    }

    fn validate(&self, configs: &[LoggerConfig]) -> Result<Vec<ResolvedConfig>> {
        if let Some(allowed) = &self.allow_names {
            for config in configs {
                if !config.logger.is_empty() && !allowed.iter().any(|name| *name == config.logger) {
                    return Err(LoggerError::unknown_logger(&config.logger));
                }
            }
        }

        configs
            .iter()
            .map(|config| -> Result<ResolvedConfig> {
                let resolved = config.resolve()?;
                self.registry.validate(&resolved.dsn)?;
                Ok(resolved)
            })
            .collect()
    }
}
