//! Svcadmin CLI - Watch and tune a running service from the terminal
//!
//! Usage:
//!   svcadmin meta                     Show service identification
//!   svcadmin resources                List resource names
//!   svcadmin status [RESOURCE]        Stream live status (default: self)
//!   svcadmin settings [--watch]       Show runtime settings
//!   svcadmin settings --history KEY   Show earlier values of a setting
//!   svcadmin set <KEY> <VALUE>        Change a runtime setting
//!   svcadmin logs files               List session log files
//!   svcadmin logs show <ID>           Show a session trace
//!   svcadmin dashboard                Interactive dashboard

mod api;
mod commands;
mod config;
mod feed;
mod session;
#[cfg(test)]
mod testing;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::Config;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "svcadmin")]
#[command(author = "Svcadmin Team")]
#[command(version)]
#[command(about = "Watch and tune a running service from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Admin backend URL (overrides the config file)
    #[arg(short, long, global = true, env = "SVCADMIN_SERVER_URL")]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service identification
    Meta,

    /// List the names of resources the service reports status for
    Resources,

    /// Stream live status of the service or one of its resources
    Status {
        /// Resource name
        #[arg(default_value = "self")]
        resource: String,

        /// Print one snapshot and exit
        #[arg(long)]
        once: bool,

        /// Reconnect this many seconds after the stream drops
        #[arg(long, value_name = "SECS")]
        retry: Option<u64>,
    },

    /// Show runtime settings
    Settings {
        /// Keep running and print changes as they happen
        #[arg(short, long)]
        watch: bool,

        /// Show earlier values of one setting instead
        #[arg(long, value_name = "KEY", conflicts_with = "watch")]
        history: Option<String>,
    },

    /// Change a runtime setting
    Set {
        key: String,
        value: String,
    },

    /// Browse session logs
    Logs {
        #[command(subcommand)]
        command: LogsCommand,
    },

    /// Interactive dashboard
    Dashboard,

    /// Show or update the saved configuration
    Config {
        /// Save this server URL as the default
        #[arg(long)]
        server_url: Option<String>,

        /// Save this HTTP timeout (seconds)
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[derive(Subcommand)]
enum LogsCommand {
    /// List session log files, newest first
    Files,

    /// Show the trace of one session
    Show {
        /// Session or trace id
        id: String,

        /// Log file (default: the newest)
        #[arg(short, long)]
        file: Option<String>,

        /// Include request and response dumps
        #[arg(long)]
        dumps: bool,
    },
}

fn init_logging(verbose: bool, to_file: bool) -> Result<()> {
    let log_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{},svcadmin_cli=info", log_level).into());

    if to_file {
        // The dashboard owns the terminal
        config::ensure_dirs()?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(config::logs_dir().join("dashboard.log"))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().without_time())
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, matches!(cli.command, Commands::Dashboard))?;

    let config = Config::load()?.with_server(cli.server);

    match cli.command {
        Commands::Meta => {
            commands::info::meta(&config).await?;
        }

        Commands::Resources => {
            commands::info::resources(&config).await?;
        }

        Commands::Status {
            resource,
            once,
            retry,
        } => {
            let opts = commands::status::StatusOptions {
                resource,
                once,
                retry,
            };
            commands::status::run(&config, opts).await?;
        }

        Commands::Settings { watch, history } => {
            commands::settings::show(&config, watch, history.as_deref()).await?;
        }

        Commands::Set { key, value } => {
            commands::settings::set(&config, &key, &value).await?;
        }

        Commands::Logs { command } => match command {
            LogsCommand::Files => {
                commands::logs::files(&config).await?;
            }
            LogsCommand::Show { id, file, dumps } => {
                commands::logs::show(&config, &id, file, dumps).await?;
            }
        },

        Commands::Dashboard => {
            commands::dashboard::run(&config).await?;
        }

        Commands::Config {
            server_url,
            timeout,
        } => {
            // Saved values only, without command line overrides
            commands::config::run(Config::load()?, server_url, timeout)?;
        }
    }

    Ok(())
}
