//! Installing a `tracing` subscriber from a [`Config`].
//!
//! The library only emits `tracing` events; callers that want them printed
//! install a subscriber once per process.

use crate::config::Config;
use crate::result::PageResult;
use std::fs::OpenOptions;
use std::sync::Mutex;

/// Install a global fmt subscriber honoring `config.log_level` and `config.log_path`
///
/// Returns `Ok(false)` when another global subscriber is already installed.
///
/// # Errors
///
/// Returns an I/O error if the log file cannot be opened.
pub fn install(config: &Config) -> PageResult<bool> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(config.log_level.level_filter())
        .with_target(true);

    let installed = match &config.log_path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok()
        }
        None => builder.try_init().is_ok(),
    };

    if installed {
        tracing::debug!(level = %config.log_level, "logging installed");
    }
    Ok(installed)
}
