//! Process-wide logger manager
//!
//! Starts out as an empty manager, so every logger handed out before the
//! first [`apply`] is a no-op. Swapping the manager never blocks writers:
//! a logger obtained from the old manager keeps its cores until dropped.
//!
//! # Example
//!
//! ```no_run
//! use rust_log_writer::core::LoggerConfig;
//! use rust_log_writer::global;
//!
//! global::apply(&[
//!     LoggerConfig::new("").with_destination("/var/log/app/app.log"),
//!     LoggerConfig::new("access").with_destination("stdout").with_encoding("mixed"),
//! ])
//! .expect("Failed to configure logging");
//!
//! global::logger("access").info("listening", &[]).unwrap();
//! ```

use crate::core::{Logger, LoggerConfig, Manager, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;

static CURRENT: Lazy<RwLock<Arc<Manager>>> = Lazy::new(|| RwLock::new(Arc::new(Manager::empty())));

/// Snapshot of the active manager
pub fn current() -> Arc<Manager> {
    Arc::clone(&CURRENT.read())
}

/// Install `manager` and return the one it replaces
pub fn replace(manager: Manager) -> Arc<Manager> {
    let next = Arc::new(manager);
    std::mem::replace(&mut *CURRENT.write(), next)
}

/// Build a manager from `configs` and install it
///
/// On error the active manager is left untouched.
pub fn apply(configs: &[LoggerConfig]) -> Result<Arc<Manager>> {
    let manager = Manager::new(configs)?;
    Ok(replace(manager))
}

/// Validate `configs` as [`apply`] would, without opening anything
pub fn check(configs: &[LoggerConfig], allow_names: Option<&[&str]>) -> Result<()> {
    Manager::check(configs, allow_names)
}

pub fn logger(name: &str) -> Logger {
    current().logger(name).clone()
}

pub fn default_logger() -> Logger {
    current().default_logger().clone()
}
