//! Tessera reports through the standard `log` facade: component and query registration, tick
//! summaries, ignored mutations and query drift.
//!
//! The five macros `error!`, `warn!`, `info!`, `debug!` and `trace!` are re-exported so systems
//! can log the same way:
//!
//! ```rust
//! use tessera::info;
//!
//! pub fn do_a_thing() {
//!     info!("A thing is being done.");
//! }
//! ```
//!
//! Output is off until a level is set. With the `logging` feature (on by default) messages go to
//! a `log4rs` console appender; without it only the `log` max level is maintained and the
//! embedding application installs its own logger.
//!
//! ```rust
//! use tessera::log::{set_log_level, set_module_filters, LevelFilter};
//!
//! pub fn setup_logging() {
//!     set_log_level(LevelFilter::Info);
//!     // Keep tick summaries but silence per-entity query traces.
//!     set_module_filters(&[("tessera::query", LevelFilter::Off)]);
//! }
//! ```
//!
//! [`ManagerConfig`](crate::config::ManagerConfig) drives the same two calls from a config file.
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

pub use log::{debug, error, info, trace, warn, LevelFilter};

use crate::hashing::HashMap;
#[cfg(feature = "logging")]
use log4rs::Handle;
use std::sync::{LazyLock, Mutex, MutexGuard};

static LOG_SETTINGS: LazyLock<Mutex<LogSettings>> = LazyLock::new(Mutex::default);

/// The process-wide logging state. Loggers are global, so there is exactly one of these, reached
/// through [`settings`].
#[derive(Debug)]
pub(in crate::log) struct LogSettings {
    /// The level for every target without a module filter. `Off` silences them.
    pub(in crate::log) level: LevelFilter,
    /// Module path (`"tessera::query"`) to level.
    pub(in crate::log) module_levels: HashMap<String, LevelFilter>,

    #[cfg(feature = "logging")]
    handle: Option<Handle>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::Off,
            module_levels: HashMap::default(),

            #[cfg(feature = "logging")]
            handle: None,
        }
    }
}

impl LogSettings {
    /// Returns whether the level changed.
    fn set_level(&mut self, level: LevelFilter) -> bool {
        std::mem::replace(&mut self.level, level) != level
    }

    /// Returns whether the filters changed.
    fn replace_module_levels(&mut self, module_levels: HashMap<String, LevelFilter>) -> bool {
        if self.module_levels == module_levels {
            return false;
        }
        self.module_levels = module_levels;
        true
    }
}

/// Sets the level for every target without a module filter.
pub fn set_log_level(level: LevelFilter) {
    let mut settings = settings();
    if settings.set_level(level) {
        settings.install();
    }
}

/// Replaces every module filter with `module_filters`. The logger is rebuilt at most once.
pub fn set_module_filters<S: AsRef<str>>(module_filters: &[(S, LevelFilter)]) {
    let module_levels = module_filters
        .iter()
        .map(|(module, level)| (module.as_ref().to_string(), *level))
        .collect();
    let mut settings = settings();
    if settings.replace_module_levels(module_levels) {
        settings.install();
    }
}

fn settings() -> MutexGuard<'static, LogSettings> {
    LOG_SETTINGS
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
