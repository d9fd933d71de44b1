//! `relink` - keeps the TCP connections listed in a configuration file in
//! line with that file.

mod cli;
mod provider;
mod shutdown;

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use relink_config::{ConfigFile, Configuration};
use relink_resource::{ContainerBuilder, ContainerConfig, ResourceContainer, run_service};

use crate::cli::Cli;
use crate::provider::TcpProvider;
use crate::shutdown::ShutdownSignal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigFile::open(&cli.config)
        .await
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let config = Arc::new(config);
    let snapshot = config.snapshot();

    let _log_guard = relink_log::init_with(log_config(&snapshot)?).context("installing logger")?;

    let container = build_container(&cli, &snapshot, &config)?;
    let shutdown = ShutdownSignal::install();
    let cancel = shutdown.token();

    if cli.once {
        let result = container.run(&cancel).await;
        log_states(container.as_ref());
        container.stop().await;
        return result.context("refresh pass failed");
    }

    run_service(&cancel, container.as_ref())
        .await
        .context("starting resources")?;
    tracing::info!("stopped");
    Ok(())
}

/// The `log` section, or the environment when there is none.
fn log_config(snapshot: &Configuration) -> anyhow::Result<relink_log::Config> {
    if !snapshot.exists("log") {
        return Ok(relink_log::Config::from_env());
    }
    snapshot
        .scan("log")
        .context("invalid `log` section in configuration")
}

fn build_container(
    cli: &Cli,
    snapshot: &Configuration,
    config: &Arc<ConfigFile>,
) -> anyhow::Result<Arc<dyn ResourceContainer>> {
    let mut container_config: ContainerConfig =
        snapshot.scan_or("container", ContainerConfig::default());
    if let Some(schedule) = &cli.schedule {
        container_config.schedule = Some(schedule.clone());
    }
    if cli.once {
        container_config.schedule = None;
    }

    let names: Vec<String> = snapshot
        .get("resources")
        .and_then(|resources| resources.as_map())
        .map(|resources| resources.into_keys().collect())
        .unwrap_or_default();
    anyhow::ensure!(!names.is_empty(), "no resources configured under `resources`");

    let builder = names
        .iter()
        .fold(ContainerBuilder::from_config(container_config), |builder, name| {
            builder.provider(name.clone(), TcpProvider::new(name, Arc::clone(config)))
        });
    tracing::info!(resources = ?names, "container configured");
    Ok(builder.build()?)
}

fn log_states(container: &dyn ResourceContainer) {
    for name in container.names() {
        match container.state(&name) {
            Some(state) => tracing::info!(
                resource = %name,
                fingerprint = %state.fingerprint,
                updated_at = %state.updated_at,
                "connected"
            ),
            None => tracing::warn!(resource = %name, "not connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_section_is_read_when_present() {
        let snapshot: Configuration = r#"{"log": {"level": "debug", "format": "json"}}"#
            .parse()
            .unwrap();
        let config = log_config(&snapshot).unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, relink_log::Format::Json);
    }

    #[test]
    fn malformed_log_section_is_an_error() {
        let snapshot: Configuration = r#"{"log": {"format": "yaml"}}"#.parse().unwrap();
        let err = log_config(&snapshot).unwrap_err();
        assert!(err.to_string().contains("`log` section"));
    }
}
