//! Tracing setup
//!
//! The subscriber is installed before the config file is read so that
//! config loading is logged. It starts at `RUST_LOG`, or `info` when unset;
//! once the config is loaded, [`LogLevel::apply_configured`] switches to
//! `logging.level` unless `RUST_LOG` was given.

use tracing_subscriber::{reload, EnvFilter, Registry};

/// Filter level before the config file is read
pub const STARTUP_LEVEL: &str = "info";

/// Handle for replacing the startup filter
pub struct LogLevel {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

/// Build the reloadable filter layer
///
/// `env_filter` is the filter parsed from `RUST_LOG`, if any; it always wins
/// over the configured level.
pub fn startup_filter(env_filter: Option<EnvFilter>) -> (reload::Layer<EnvFilter, Registry>, LogLevel) {
    let from_env = env_filter.is_some();
    let (layer, handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new(STARTUP_LEVEL)));
    (layer, LogLevel { handle, from_env })
}

impl LogLevel {
    /// Switch to the configured level
    ///
    /// Returns `false` when `RUST_LOG` is in effect and nothing changed.
    pub fn apply_configured(&self, level: &str) -> Result<bool, reload::Error> {
        if self.from_env {
            return Ok(false);
        }
        self.handle.modify(|filter| *filter = EnvFilter::new(level))?;
        Ok(true)
    }
}
