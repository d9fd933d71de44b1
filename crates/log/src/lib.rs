//! # Relink Log
//!
//! Global `tracing` subscriber setup: `EnvFilter` directives, pretty, compact
//! or JSON output, and an optional handle to change the filter at runtime.
//!
//! ```no_run
//! let _guard = relink_log::init().expect("logger should install");
//! tracing::info!("ready");
//! ```

mod builder;
mod config;
mod error;

pub use builder::{LoggerBuilder, LoggerGuard, ReloadHandle};
pub use config::{Config, DisplayConfig, Format};
pub use error::{LogError, LogResult};

/// Install the logger configured from the environment.
///
/// # Errors
/// See [`LoggerBuilder::build`].
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::from_env())
}

/// Install the logger with `config`.
///
/// # Errors
/// See [`LoggerBuilder::build`].
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}
