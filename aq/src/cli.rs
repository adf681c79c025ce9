//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aq - auto-refreshing query runner
#[derive(Parser)]
#[command(
    name = "aq",
    about = "Poll an endpoint with a debounced, auto-refreshing query coordinator",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll a URL until Ctrl-C, reporting each result
    ///
    /// While running, type `r` to refresh now, `p` to pause or resume
    /// auto-refresh, `s` for status and `q` to quit.
    Watch {
        /// URL to poll
        url: String,

        /// Seconds between the end of one poll and the start of the next
        #[arg(short, long)]
        interval: Option<u64>,

        /// Consecutive connection errors before reporting the endpoint unreachable
        #[arg(short, long)]
        threshold: Option<u32>,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Start with auto-refresh paused
        #[arg(long)]
        no_refresh: bool,
    },

    /// Print the effective configuration
    Config,
}

/// Resolve the log level, defaulting to INFO
pub fn parse_log_level(level: Option<&str>) -> tracing::Level {
    level
        .and_then(|l| l.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::parse_from(["aq", "watch", "http://localhost:8080/health", "--interval", "5"]);
        match cli.command {
            Command::Watch {
                url,
                interval,
                threshold,
                timeout,
                no_refresh,
            } => {
                assert_eq!(url, "http://localhost:8080/health");
                assert_eq!(interval, Some(5));
                assert_eq!(threshold, None);
                assert_eq!(timeout, 10);
                assert!(!no_refresh);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level(Some("debug")), tracing::Level::DEBUG);
        assert_eq!(parse_log_level(Some("nonsense")), tracing::Level::INFO);
        assert_eq!(parse_log_level(None), tracing::Level::INFO);
    }
}
