use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::log::LogSettings;

// ISO 8601 timestamp, colored level, target.
const PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%SZ)} {h({l})} {t} - {m}{n}";

const APPENDER: &str = "console";

impl LogSettings {
    /// Builds a `log4rs` config from these settings and swaps it in, initializing the global
    /// logger on first use.
    pub(in crate::log) fn install(&mut self) {
        let console = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build();
        let loggers = self
            .module_levels
            .iter()
            .map(|(module, level)| Logger::builder().build(module.clone(), *level));
        let config = Config::builder()
            .appender(Appender::builder().build(APPENDER, Box::new(console)))
            .loggers(loggers)
            .build(Root::builder().appender(APPENDER).build(self.level));
        let config = match config {
            Ok(config) => config,
            Err(error) => {
                eprintln!("tessera: invalid logging configuration: {error}");
                log::set_max_level(self.level);
                return;
            }
        };

        if let Some(handle) = &self.handle {
            handle.set_config(config);
            return;
        }
        match log4rs::init_config(config) {
            Ok(handle) => self.handle = Some(handle),
            // Another logger owns the facade; only the max level is ours to set.
            Err(_) => log::set_max_level(self.level),
        }
    }
}
