//! Session log commands

use crate::api::AdminClient;
use crate::config::Config;
use crate::session::{LoadOutcome, SessionLoader};
use anyhow::{anyhow, bail, Result};
use console::style;
use svcadmin_common::{ResponseRecord, SessionTrace};

/// Handle `logs files`
pub async fn files(config: &Config) -> Result<()> {
    let loader = SessionLoader::new(AdminClient::from_config(config)?);
    let files = loader.list_files().await.map_err(|e| anyhow!(e.payload()))?;

    if files.is_empty() {
        println!("{}", style("No session log files").dim());
        return Ok(());
    }

    for (i, file) in files.iter().enumerate() {
        if i == 0 {
            println!("{} {}", file, style("(latest)").dim());
        } else {
            println!("{}", file);
        }
    }
    Ok(())
}

/// Handle `logs show`
pub async fn show(config: &Config, id: &str, file: Option<String>, dumps: bool) -> Result<()> {
    let loader = SessionLoader::new(AdminClient::from_config(config)?);

    let file = match file {
        Some(file) => file,
        None => match loader.default_file().await.map_err(|e| anyhow!(e.payload()))? {
            Some(file) => file,
            None => bail!("No session log files to search"),
        },
    };

    let trace = match loader
        .load(&file, id)
        .await
        .map_err(|e| anyhow!(e.payload()))?
    {
        LoadOutcome::Loaded(trace) => trace,
        LoadOutcome::Superseded => return Ok(()),
    };

    println!("{} {}", style(&file).dim(), style(format!("#{}", id)).bold());
    println!();
    for line in render_tree(&trace, dumps) {
        println!("{}", line);
    }
    Ok(())
}

fn render_tree(trace: &SessionTrace, dumps: bool) -> Vec<String> {
    let mut lines = Vec::new();

    for (depth, node) in trace.walk() {
        let indent = "  ".repeat(depth);
        let duration = node
            .duration
            .map(|secs| format!("{:.3}s", secs))
            .unwrap_or_else(|| "-".to_string());
        let marker = if node.has_errors() {
            style("✗").red().bold()
        } else {
            style("•").cyan()
        };

        lines.push(format!(
            "{}{} {} {} {}",
            indent,
            marker,
            style(&node.caption).bold(),
            style(node.request_time.format("%H:%M:%S%.3f")).dim(),
            duration
        ));

        if !node.error_message.is_empty() {
            lines.push(format!("{}    {}", indent, style(&node.error_message).red()));
        }

        if dumps {
            if let Some(dump) = &node.request_dump {
                push_block(&mut lines, &indent, "request", &dump.to_plain_text());
            }
            for response in &node.responses {
                push_record(&mut lines, &indent, "response", response);
            }
        }
        for error in &node.errors {
            push_record(&mut lines, &indent, "error", error);
        }
    }

    lines
}

fn push_record(lines: &mut Vec<String>, indent: &str, label: &str, record: &ResponseRecord) {
    let label = format!("{} {}", label, record.time.format("%H:%M:%S%.3f"));
    if let Some(dump) = &record.dump {
        push_block(lines, indent, &label, &dump.to_plain_text());
    }
    if let Some(error) = &record.error_html {
        push_block(lines, indent, &label, &error.to_plain_text());
    }
}

fn push_block(lines: &mut Vec<String>, indent: &str, label: &str, text: &str) {
    lines.push(format!("{}    {}", indent, style(label).dim()));
    for line in text.lines() {
        lines.push(format!("{}      {}", indent, line));
    }
}
