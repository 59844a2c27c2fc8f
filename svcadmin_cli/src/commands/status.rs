//! Live status command

use crate::api::AdminClient;
use crate::config::Config;
use crate::feed::{ConnectionState, StatusFeed, StatusUpdate};
use anyhow::{anyhow, bail, Result};
use chrono::Local;
use console::style;
use std::time::Duration;
use svcadmin_common::{format_std_duration, StatusSnapshot, SELF_RESOURCE};

/// Status command options
#[derive(Debug, Clone)]
pub struct StatusOptions {
    pub resource: String,
    pub once: bool,
    pub retry: Option<u64>,
}

/// Handle status command
pub async fn run(config: &Config, opts: StatusOptions) -> Result<()> {
    let client = AdminClient::from_config(config)?;
    check_resource(&client, &opts.resource).await?;

    // A single resource snapshot has its own endpoint
    if opts.once && opts.resource != SELF_RESOURCE {
        let snapshot = client
            .resource_status(&opts.resource)
            .await
            .map_err(|e| anyhow!(e.payload()))?;
        println!("{}", render_snapshot(&opts.resource, &snapshot)?);
        return Ok(());
    }

    let mut feed = StatusFeed::new(config.websocket_base()?);
    feed.connect(&opts.resource);
    println!(
        "{} Connecting to {} status...",
        style("→").cyan(),
        style(&opts.resource).bold()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                feed.disconnect();
                println!();
                return Ok(());
            }
            Some(event) = feed.next_event() => {
                match feed.handle(event) {
                    Ok(StatusUpdate::Snapshot) => {
                        if let Some(snapshot) = feed.snapshot() {
                            println!("{}", render_snapshot(&opts.resource, snapshot)?);
                        }
                        if opts.once {
                            feed.disconnect();
                            return Ok(());
                        }
                    }
                    Ok(StatusUpdate::State(ConnectionState::Connected)) => {
                        println!("{} Connected, waiting for updates", style("✓").green().bold());
                    }
                    Ok(StatusUpdate::State(ConnectionState::Disconnected)) => {
                        let Some(secs) = opts.retry else {
                            println!("{} Status stream closed", style("✗").red().bold());
                            return Ok(());
                        };
                        let delay = Duration::from_secs(secs);
                        println!("{}", reconnect_notice(delay));
                        tokio::select! {
                            _ = tokio::signal::ctrl_c() => return Ok(()),
                            _ = tokio::time::sleep(delay) => {}
                        }
                        feed.connect(&opts.resource);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        eprintln!("{} Skipped malformed update: {}", style("!").yellow().bold(), e);
                    }
                }
            }
        }
    }
}

/// Fail early on a resource the service does not report. If the list cannot
/// be fetched the stream is attempted anyway.
async fn check_resource(client: &AdminClient, resource: &str) -> Result<()> {
    if resource == SELF_RESOURCE {
        return Ok(());
    }

    match client.resources().await {
        Ok(list) if !list.contains(resource) => bail!(
            "Unknown resource '{}'. Available: {}",
            resource,
            list.targets().join(", ")
        ),
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::warn!("Could not list resources: {}", e);
            Ok(())
        }
    }
}

fn reconnect_notice(delay: Duration) -> String {
    format!(
        "{} Status stream closed, reconnecting in {}",
        style("!").yellow().bold(),
        format_std_duration(delay)
    )
}

fn render_snapshot(resource: &str, snapshot: &StatusSnapshot) -> Result<String> {
    Ok(format!(
        "{} {}\n{}",
        style(Local::now().format("%H:%M:%S")).dim(),
        style(resource).bold(),
        serde_json::to_string_pretty(snapshot)?
    ))
}
