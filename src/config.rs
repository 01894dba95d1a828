//! Declarative settings for a [`Manager`](crate::manager::Manager), loadable from JSON.
//!
//! ```json
//! {
//!     "log_level": "info",
//!     "module_filters": [["tessera::query", "off"]],
//!     "validate_queries": true,
//!     "entity_capacity": 10000
//! }
//! ```
//!
//! Every field is optional.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EcsError;
use crate::log::{set_log_level, set_module_filters, LevelFilter};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// The global log level (`"off"`, `"error"`, ..., `"trace"`). Left untouched if absent.
    pub log_level: Option<String>,
    /// `(module path, level)` pairs. When non-empty they replace any installed module filters.
    pub module_filters: Vec<(String, String)>,
    /// Brute-force check every query after each tick. Slow; meant for tests and debugging.
    pub validate_queries: bool,
    /// Initial capacity of the live entity set.
    pub entity_capacity: usize,
}

fn parse_level(level: &str) -> Result<LevelFilter, EcsError> {
    LevelFilter::from_str(level)
        .map_err(|_| EcsError::InvalidConfig(format!("unknown log level `{level}`")))
}

impl ManagerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EcsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, EcsError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// The parsed global log level, if one is configured.
    pub fn level_filter(&self) -> Result<Option<LevelFilter>, EcsError> {
        self.log_level.as_deref().map(parse_level).transpose()
    }

    /// Applies the logging settings to the global logger. Every level is parsed before anything is
    /// applied, so an invalid configuration changes nothing.
    pub fn apply_logging(&self) -> Result<(), EcsError> {
        let level = self.level_filter()?;
        let module_filters = self
            .module_filters
            .iter()
            .map(|(module, level)| Ok((module, parse_level(level)?)))
            .collect::<Result<Vec<_>, EcsError>>()?;

        if let Some(level) = level {
            set_log_level(level);
        }
        if !module_filters.is_empty() {
            set_module_filters(&module_filters);
        }
        Ok(())
    }
}
