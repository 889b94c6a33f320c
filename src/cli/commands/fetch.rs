//! Fetch command - request assets through the active generation
//!
//! The active generation is the one whose activation finished last, which
//! is not necessarily the configured one: after a failed or pending upgrade
//! the previous generation keeps serving.

use crate::agent::{FetchOutcome, ResponseSource};
use crate::cache::AssetRequest;
use crate::cli::args::{FetchArgs, OutputFormat};
use crate::cli::commands::{agent_for, store_manager};
use crate::config::Config;
use crate::error::{GardenError, GardenResult};
use crate::host::Host;
use crate::ui;
use serde::Serialize;
use std::io::{self, Write};
use tracing::debug;

/// One answered request, as printed
#[derive(Debug, Serialize)]
struct FetchRow {
    target: String,
    url: String,
    status: u16,
    source: ResponseSource,
    bytes: usize,
}

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> GardenResult<()> {
    let manager = store_manager(config)?;
    let origin = manager.origin().clone();
    let active = manager.active_generation(&config.agent.owner_prefix).await?;

    let host = Host::new(manager.clone());
    match active {
        Some(generation) => {
            let agent = agent_for(config, manager, generation)?;
            host.resume(agent).await?;
        }
        None => debug!("No activated generation, requests go to the network"),
    }

    let mut rows = Vec::with_capacity(args.targets.len());
    let mut first: Option<FetchOutcome> = None;

    for target in &args.targets {
        let url = origin.resolve(target)?;
        let request = AssetRequest::new(args.method.as_str(), url.clone());
        let outcome = host.fetch(&request).await?;

        rows.push(FetchRow {
            target: target.clone(),
            url: url.to_string(),
            status: outcome.response.status,
            source: outcome.source,
            bytes: outcome.response.body.len(),
        });
        first.get_or_insert(outcome);
    }

    if args.body {
        if let Some(outcome) = first {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&outcome.response.body)
                .and_then(|_| stdout.flush())
                .map_err(|e| GardenError::io("writing response body", e))?;
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&rows),
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Plain => print_plain(&rows),
    }

    Ok(())
}

fn print_table(rows: &[FetchRow]) {
    let table = ui::Table::fetch_results();
    table.print_header();
    for row in rows {
        table.print_row(&[
            row.target.clone(),
            row.status.to_string(),
            ui::source_label(row.source),
            row.bytes.to_string(),
        ]);
    }

    let hits = rows
        .iter()
        .filter(|r| r.source == ResponseSource::Cache)
        .count();
    println!();
    println!("{} hit(s), {} miss(es)", hits, rows.len() - hits);
}

fn print_json(rows: &[FetchRow]) -> GardenResult<()> {
    let json = serde_json::to_string_pretty(rows)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(rows: &[FetchRow]) {
    for row in rows {
        println!("{} {} {}", row.source, row.status, row.target);
    }
}
