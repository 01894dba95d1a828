/*!

Without the `logging` feature no logger is installed; the embedding application picks its own
backend and only the `log` max level is kept in step with the settings.

*/

use crate::log::{LevelFilter, LogSettings};

impl LogSettings {
    pub(in crate::log) fn install(&mut self) {
        let loudest = self
            .module_levels
            .values()
            .copied()
            .fold(self.level, LevelFilter::max);
        log::set_max_level(loudest);
    }
}
