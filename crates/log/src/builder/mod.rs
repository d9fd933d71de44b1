//! Logger builder implementation
//!
//! - `format`: fmt layer creation macros
//! - `reload`: runtime filter reload

#[macro_use]
mod format;
mod reload;

pub use reload::ReloadHandle;

use tracing_subscriber::layer::{Layer, Layered};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format};
use crate::error::{LogError, LogResult};
use reload::FilterLayer;

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Guard returned by [`LoggerBuilder::build`]
///
/// Holds the reload handle when the filter is reloadable. Keep it for the
/// lifetime of the process.
#[derive(Debug)]
pub struct LoggerGuard {
    reload_handle: Option<ReloadHandle>,
}

impl LoggerGuard {
    /// Handle for changing the filter at runtime, if the logger was built
    /// with `reloadable = true`.
    #[must_use]
    pub fn reload_handle(&self) -> Option<&ReloadHandle> {
        self.reload_handle.as_ref()
    }
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Build and install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Filter string cannot be parsed (checked before any global state changes)
    /// - A global subscriber is already installed
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::filter(&self.config.level, e))?;

        let (filter_layer, reload_handle) =
            reload::create_filter_layer(filter, &self.config.level, self.config.reloadable);

        let display = &self.config.display;
        match self.config.format {
            Format::Pretty => {
                install_with_time!(filter_layer, create_fmt_layer!(pretty, display), display.time)?;
            }
            Format::Compact => {
                install_with_time!(filter_layer, create_fmt_layer!(compact, display), display.time)?;
            }
            Format::Json => {
                install_with_time!(filter_layer, create_json_layer!(display), display.time)?;
            }
        }

        tracing::debug!(
            level = %self.config.level,
            format = ?self.config.format,
            reloadable = self.config.reloadable,
            "logger initialized"
        );
        Ok(LoggerGuard { reload_handle })
    }
}

/// Stack `fmt_layer` on the filter and install the result globally.
fn install<L>(filter_layer: FilterLayer, fmt_layer: L) -> LogResult<()>
where
    L: Layer<Layered<FilterLayer, Registry>> + Send + Sync + 'static,
{
    Registry::default()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| LogError::Init(e.to_string()))
}
