//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Keep TCP connections in line with a JSON configuration file
#[derive(Parser, Debug)]
#[command(name = "relink")]
#[command(version, about)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "RELINK_CONFIG", default_value = "relink.json")]
    pub config: PathBuf,

    /// Refresh schedule; overrides `container.schedule`
    ///
    /// A cron expression with a seconds field (`*/30 * * * * *`) or
    /// `@every <duration>` (`@every 1m`).
    #[arg(short, long)]
    pub schedule: Option<String>,

    /// Run a single pass, close everything and exit
    #[arg(long, conflicts_with = "schedule")]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from(["relink", "-c", "/etc/relink.json", "-s", "@every 30s"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/relink.json"));
        assert_eq!(cli.schedule.as_deref(), Some("@every 30s"));
        assert!(!cli.once);
    }

    #[test]
    fn once_conflicts_with_schedule() {
        assert!(Cli::try_parse_from(["relink", "--once", "--schedule", "@every 1s"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
