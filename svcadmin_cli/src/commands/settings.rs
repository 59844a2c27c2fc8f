//! Runtime settings commands

use crate::api::AdminClient;
use crate::config::Config;
use crate::feed::{ConnectionState, SettingsFeed, SettingsUpdate};
use anyhow::{anyhow, bail, Result};
use console::style;
use svcadmin_common::{Setting, SettingsList};

/// Handle settings command. The first full list is printed; with `watch`
/// every later change is printed as it arrives. With `history` only the
/// past values of that key are printed.
pub async fn show(config: &Config, watch: bool, history: Option<&str>) -> Result<()> {
    let mut feed = SettingsFeed::new(config.websocket_base()?);
    feed.connect();

    let mut shown: Option<SettingsList> = None;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                feed.disconnect();
                return Ok(());
            }
            Some(event) = feed.next_event() => {
                match feed.handle(event) {
                    Ok(SettingsUpdate::Settings) => {
                        let current = feed.settings().clone();
                        if let Some(key) = history {
                            feed.disconnect();
                            let Some(setting) = current.get(key) else {
                                bail!("Unknown setting '{}'", key);
                            };
                            print_history(setting);
                            return Ok(());
                        }
                        match &shown {
                            None => print_table(&current),
                            Some(previous) => {
                                for setting in changed(previous, &current) {
                                    print_change(setting);
                                }
                            }
                        }
                        shown = Some(current);

                        if !watch {
                            feed.disconnect();
                            return Ok(());
                        }
                    }
                    Ok(SettingsUpdate::State(ConnectionState::Disconnected)) => {
                        if shown.is_none() {
                            bail!("Settings stream closed before any settings arrived");
                        }
                        println!("{} Settings stream closed", style("✗").red().bold());
                        return Ok(());
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

/// Handle set command
pub async fn set(config: &Config, key: &str, value: &str) -> Result<()> {
    let client = AdminClient::from_config(config)?;
    client
        .edit_setting(key, value)
        .await
        .map_err(|e| anyhow!(e.payload()))?;

    println!(
        "{} {} = {}",
        style("✓").green().bold(),
        style(key).bold(),
        value
    );
    Ok(())
}

/// Settings in `current` that are new or differ from `previous`
fn changed<'a>(previous: &SettingsList, current: &'a SettingsList) -> Vec<&'a Setting> {
    current
        .iter()
        .filter(|setting| previous.get(&setting.key) != Some(*setting))
        .collect()
}

fn print_table(settings: &SettingsList) {
    if settings.is_empty() {
        println!("{}", style("No settings registered").dim());
        return;
    }

    let width = settings.iter().map(|s| s.key.len()).max().unwrap_or(0);
    println!();
    for setting in settings {
        println!(
            "  {:<width$}  {}",
            style(&setting.key).bold(),
            setting.value,
            width = width
        );
        if let Some(description) = setting.description() {
            println!("  {:<width$}  {}", "", style(description).dim(), width = width);
        }
    }
    println!();
}

fn print_history(setting: &Setting) {
    println!();
    println!("  {} = {}", style(&setting.key).bold(), setting.value);
    if setting.history.is_empty() {
        println!("  {}", style("No earlier values recorded").dim());
    }
    for row in history_rows(setting) {
        println!("  {}", row);
    }
    println!();
}

/// One line per recorded value, newest first
fn history_rows(setting: &Setting) -> Vec<String> {
    let width = setting
        .history
        .iter()
        .map(|h| h.owner.len())
        .max()
        .unwrap_or(0);
    setting
        .history
        .iter()
        .map(|h| {
            format!(
                "{}  {:<width$}  {}",
                style(h.time_label()).dim(),
                h.owner,
                h.value,
                width = width
            )
        })
        .collect()
}

fn print_change(setting: &Setting) {
    println!(
        "{} {} = {}",
        style("~").cyan().bold(),
        style(&setting.key).bold(),
        setting.value
    );
}
