//! # Relink Config
//!
//! JSON configuration with dot-path access and typed accessors, plus a
//! file-backed source that picks up edits between refresh passes.

mod configuration;
mod error;
mod file;

pub use configuration::Configuration;
pub use error::{ConfigError, ConfigResult};
pub use file::ConfigFile;
