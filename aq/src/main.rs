//! aq - auto-refreshing query runner
//!
//! CLI entry point for polling an endpoint through a query coordinator.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use autoquery::cli::{Cli, Command, parse_log_level};
use autoquery::config::Config;
use autoquery::coordinator::{CoordinatorHandle, QueryCoordinator, QueryOptions, RunOptions};
use autoquery::http::{self, HttpQuery, HttpSnapshot};

fn setup_logging(log_level: Option<&str>) -> Result<PathBuf> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("autoquery")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Log to a file so stdout stays readable
    let level = parse_log_level(log_level);
    let log_path = log_dir.join("aq.log");
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(log_path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.log_level.as_deref()) {
        eprintln!("{} {:#}", "warning:".yellow(), e);
    }

    let config = Config::load(cli.config.as_ref())?;
    config.validate()?;
    debug!(?config, "main: config loaded");

    match cli.command {
        Command::Watch {
            url,
            interval,
            threshold,
            timeout,
            no_refresh,
        } => {
            let mut config = config;
            if let Some(interval) = interval {
                config.refresh.interval_secs = interval;
            }
            if let Some(threshold) = threshold {
                config.refresh.connection_error_threshold = threshold;
            }
            if no_refresh {
                config.refresh.enabled = false;
            }
            config.validate()?;
            watch(&config, url, Duration::from_secs(timeout)).await
        }
        Command::Config => {
            let yaml = serde_yaml::to_string(&config).context("Failed to serialize config")?;
            print!("{}", yaml);
            Ok(())
        }
    }
}

async fn watch(config: &Config, url: String, timeout: Duration) -> Result<()> {
    let query = HttpQuery::new(timeout)?;

    let options = QueryOptions::from_config(config, query, print_snapshot)
        .auto_refresh()
        .is_connection_error(http::is_connection_error)
        .on_connection_error(|| println!("{}", "endpoint unreachable".red().bold()))
        .on_error(|e| println!("{} {:#}", "error:".red(), e))
        .on_loading_change(|loading| debug!(%loading, "watch: loading changed"))
        .on_refreshing_change(|refreshing| debug!(%refreshing, "watch: refreshing changed"));

    println!(
        "Watching {} every {}s (r = refresh, p = pause/resume, s = status, q = quit)",
        url.bold(),
        config.refresh.interval_secs
    );
    let handle = QueryCoordinator::spawn(url, options);

    let mut auto_refresh = config.refresh.enabled;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    // stdin closed; keep polling until Ctrl-C
                    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
                    break;
                };
                if !handle_key(&handle, line.trim(), &mut auto_refresh).await? {
                    break;
                }
            }
        }
    }

    handle.shutdown()?;
    println!("Stopped");
    Ok(())
}

/// Returns false when the user asked to quit
async fn handle_key(handle: &CoordinatorHandle<String>, key: &str, auto_refresh: &mut bool) -> Result<bool> {
    match key {
        "r" => handle.do_query(RunOptions::default())?,
        "p" => {
            *auto_refresh = !*auto_refresh;
            handle.set_auto_refresh(*auto_refresh)?;
            let state = if *auto_refresh { "resumed" } else { "paused" };
            println!("auto-refresh {}", state.cyan());
        }
        "s" => {
            let status = handle.status().await?;
            print!("{}", serde_yaml::to_string(&status).context("Failed to serialize status")?);
        }
        "q" => return Ok(false),
        "" => {}
        other => println!("unknown command: {}", other),
    }
    Ok(true)
}

fn print_snapshot(snapshot: HttpSnapshot) {
    let status = if snapshot.status < 400 {
        snapshot.status.to_string().green()
    } else {
        snapshot.status.to_string().yellow()
    };
    println!(
        "{} {} {} bytes in {}ms",
        snapshot.url.dimmed(),
        status,
        snapshot.bytes,
        snapshot.elapsed.as_millis()
    );
}
