//! Service identification and resource listing

use crate::api::AdminClient;
use crate::config::Config;
use anyhow::{Context, Result};
use console::style;

/// Handle meta command
pub async fn meta(config: &Config) -> Result<()> {
    let client = AdminClient::from_config(config)?;
    let meta = client
        .meta()
        .await
        .with_context(|| format!("Failed to reach {}", client.base_url()))?;

    println!();
    println!("  {}", style(meta.title()).bold());
    println!();
    println!("  {:<10} {}", style("Service").dim(), meta.service_id);
    println!("  {:<10} {}", style("Version").dim(), meta.version);
    println!("  {:<10} {}", style("Venture").dim(), meta.venture);
    println!("  {:<10} {}", style("Env").dim(), meta.env);
    println!(
        "  {:<10} {}",
        style("Profiling").dim(),
        if meta.pprof_enabled {
            style("enabled").green()
        } else {
            style("disabled").dim()
        }
    );
    println!();

    Ok(())
}

/// Handle resources command
pub async fn resources(config: &Config) -> Result<()> {
    let client = AdminClient::from_config(config)?;
    let list = client
        .resources()
        .await
        .with_context(|| format!("Failed to reach {}", client.base_url()))?;

    println!();
    if !list.caption.is_empty() {
        println!("  {}", style(&list.caption).bold());
        println!();
    }

    for target in list.targets() {
        println!("  {} {}", style("•").cyan(), target);
    }

    if list.resources.is_empty() {
        println!();
        println!("  {}", style("The service reports no resources").dim());
    }
    println!();

    Ok(())
}
