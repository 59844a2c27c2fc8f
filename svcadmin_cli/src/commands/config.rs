//! Show or update the saved configuration

use crate::config::{config_file, Config};
use anyhow::{bail, Result};
use console::style;

/// Handle config command. With no options the effective configuration is
/// printed; otherwise the given values are saved.
pub fn run(mut config: Config, server_url: Option<String>, timeout: Option<u64>) -> Result<()> {
    if server_url.is_none() && timeout.is_none() {
        println!();
        println!("  {:<10} {}", style("File").dim(), config_file().display());
        println!("  {:<10} {}", style("Server").dim(), config.server_url);
        println!("  {:<10} {}s", style("Timeout").dim(), config.timeout_secs);
        println!();
        return Ok(());
    }

    if let Some(url) = server_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("Server URL must start with http:// or https://");
        }
        config.server_url = url;
    }
    if let Some(secs) = timeout {
        if secs == 0 {
            bail!("Timeout must be at least one second");
        }
        config.timeout_secs = secs;
    }

    config.save()?;
    println!(
        "{} Saved configuration to {}",
        style("✓").green().bold(),
        config_file().display()
    );

    Ok(())
}
