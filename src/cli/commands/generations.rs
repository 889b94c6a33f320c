//! Generations command - list generations in the store

use crate::cache::{GenerationState, GenerationTag};
use crate::cli::args::{GenerationsArgs, OutputFormat};
use crate::cli::commands::store_manager;
use crate::config::Config;
use crate::error::GardenResult;
use crate::ui::{self, UiContext};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One registry entry, as printed
#[derive(Debug, Serialize)]
struct GenerationRow {
    tag: GenerationTag,
    state: Option<GenerationState>,
    owned: bool,
    current: bool,
    entries: usize,
    created_at: Option<DateTime<Utc>>,
    activated_at: Option<DateTime<Utc>>,
}

/// Execute the generations command
pub async fn execute(args: GenerationsArgs, config: &Config) -> GardenResult<()> {
    let manager = store_manager(config)?;
    let current = config.generation_tag()?;
    let prefix = &config.agent.owner_prefix;

    let mut rows = Vec::new();
    for tag in manager.list_tags().await? {
        let info = match manager.get(&tag).await? {
            Some(store) => Some(store.info().await?),
            None => None,
        };
        rows.push(GenerationRow {
            owned: tag.is_owned_by(prefix),
            current: tag == current,
            state: info.as_ref().map(|i| i.state),
            entries: info.as_ref().map(|i| i.entry_count).unwrap_or(0),
            created_at: info.as_ref().map(|i| i.created_at),
            activated_at: info.and_then(|i| i.activated_at),
            tag,
        });
    }

    if rows.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No generations in the store");
            }
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

fn print_table(rows: &[GenerationRow]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Generations");

    let table = ui::Table::generations();
    table.print_header();
    for row in rows {
        let tag = if row.current {
            format!("{} *", row.tag)
        } else {
            row.tag.to_string()
        };
        let owner = if row.owned { "self" } else { "foreign" };
        let created = row
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        table.print_row(&[
            tag,
            ui::state_label(row.state, row.activated_at.is_some()),
            owner.to_string(),
            row.entries.to_string(),
            created,
        ]);
    }

    println!();
    println!("{} generation(s), * = configured", rows.len());
}

fn print_json(rows: &[GenerationRow]) -> GardenResult<()> {
    let json = serde_json::to_string_pretty(rows)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(rows: &[GenerationRow]) {
    for row in rows {
        println!("{}", row.tag);
    }
}
