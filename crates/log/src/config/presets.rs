//! Configuration presets for common scenarios

use super::{Config, DisplayConfig, Format};

/// Env var switch: anything but `0` and `false` turns the option on.
fn switch(value: &str) -> bool {
    value != "0" && !value.eq_ignore_ascii_case("false")
}

impl Config {
    /// Create configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from any key lookup, using the same variables as
    /// [`from_env`](Self::from_env).
    ///
    /// - `RELINK_LOG`, then `RUST_LOG`: filter directives
    /// - `RELINK_LOG_FORMAT`: `pretty`, `compact` or `json`
    /// - `RELINK_LOG_TIME`, `RELINK_LOG_SOURCE`, `RELINK_LOG_COLORS`: switches
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup("RELINK_LOG").or_else(|| lookup("RUST_LOG")) {
            config.level = level;
        }
        if let Some(format) = lookup("RELINK_LOG_FORMAT") {
            config.format = format.parse().unwrap_or_default();
        }
        config.display.parse_lookup(&lookup);
        config
    }

    /// Development configuration (pretty, debug level)
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            format: Format::Pretty,
            display: DisplayConfig {
                colors: true,
                source: true,
                ..DisplayConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production configuration (JSON, info level, reloadable filter)
    #[must_use]
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            format: Format::Json,
            display: DisplayConfig {
                colors: false,
                source: false,
                flatten: true,
                ..DisplayConfig::default()
            },
            reloadable: true,
        }
    }
}

impl DisplayConfig {
    fn parse_lookup(&mut self, lookup: &impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("RELINK_LOG_TIME") {
            self.time = switch(&v);
        }
        if let Some(v) = lookup("RELINK_LOG_SOURCE") {
            self.source = switch(&v);
        }
        if let Some(v) = lookup("RELINK_LOG_COLORS") {
            self.colors = switch(&v);
        }
    }
}
