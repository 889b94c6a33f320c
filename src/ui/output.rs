//! Lifecycle output: steps, outros and the fixed-width tables printed by
//! `fetch` and `generations`.
//!
//! Every step has a cliclack rendering for terminals and a bracketed
//! `[OK]`/`[WARN]`/`[FAIL]`/`[INFO]` line for CI logs.

use super::context::UiContext;
use crate::agent::ResponseSource;
use crate::cache::GenerationState;
use console::{pad_str, style, Alignment};

#[derive(Debug, Clone, Copy)]
enum Mark {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Mark {
    fn plain(self) -> String {
        match self {
            Self::Ok => style("[OK]").green().to_string(),
            Self::Warn => style("[WARN]").yellow().to_string(),
            Self::Fail => style("[FAIL]").red().to_string(),
            Self::Info => style("[INFO]").cyan().to_string(),
        }
    }
}

fn step(ctx: &UiContext, mark: Mark, message: &str) {
    if !ctx.use_fancy_output() {
        println!("  {} {}", mark.plain(), message);
        return;
    }
    let shown = match mark {
        Mark::Ok => cliclack::log::success(message),
        Mark::Warn => cliclack::log::warning(message),
        Mark::Fail => cliclack::log::error(message),
        Mark::Info => cliclack::log::info(message),
    };
    shown.ok();
}

/// Banner naming the command being run
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).green().bold()).ok();
    } else {
        println!("{}\n", style(title).green().bold());
    }
}

/// Final line of a phase that succeeded
pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        println!("\n{} {}", Mark::Ok.plain(), message);
    }
}

/// Final line of a phase that only partly succeeded
pub fn outro_error(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).red().bold()).ok();
    } else {
        println!("\n{} {}", style("[ERROR]").red(), message);
    }
}

pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.use_fancy_output() {
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!("{}", style(title).bold());
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Mark::Ok, message);
}

/// Success step with a dimmed detail, e.g. an entry count or a tag
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(ctx, Mark::Ok, &format!("{} ({})", message, style(detail).dim()));
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    step(ctx, Mark::Warn, message);
}

/// Warning followed by what to do about it
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    step(ctx, Mark::Warn, &format!("{} - {}", message, style(hint).dim()));
}

pub fn step_error(ctx: &UiContext, message: &str) {
    step(ctx, Mark::Fail, message);
}

pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Mark::Info, message);
}

pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        println!("  {}", style(message).dim());
    }
}

pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Where a fetched response came from, colored for tables
pub fn source_label(source: ResponseSource) -> String {
    match source {
        ResponseSource::Cache => style("cache").green().to_string(),
        ResponseSource::Network => style("network").yellow().to_string(),
    }
}

/// Generation state as shown by `generations`; `None` when metadata could
/// not be read
pub fn state_label(state: Option<GenerationState>, activated: bool) -> String {
    match state {
        Some(GenerationState::Complete) if activated => style("active").green().bold().to_string(),
        Some(GenerationState::Complete) => style("complete").green().to_string(),
        Some(GenerationState::Building) => style("building").yellow().to_string(),
        None => style("unknown").dim().to_string(),
    }
}

/// Fixed-width table. Cells may carry ANSI styling; padding is measured on
/// visible width.
pub struct Table {
    columns: &'static [(&'static str, usize, Alignment)],
}

impl Table {
    /// Columns of `garden-cache fetch`
    pub fn fetch_results() -> Self {
        Self {
            columns: &[
                ("TARGET", 32, Alignment::Left),
                ("STATUS", 8, Alignment::Left),
                ("SOURCE", 10, Alignment::Left),
                ("BYTES", 10, Alignment::Right),
            ],
        }
    }

    /// Columns of `garden-cache generations`
    pub fn generations() -> Self {
        Self {
            columns: &[
                ("TAG", 32, Alignment::Left),
                ("STATE", 10, Alignment::Left),
                ("OWNER", 8, Alignment::Left),
                ("ENTRIES", 8, Alignment::Right),
                ("CREATED", 16, Alignment::Left),
            ],
        }
    }

    pub fn print_header(&self) {
        let titles: Vec<String> = self
            .columns
            .iter()
            .map(|(title, _, _)| style(*title).bold().to_string())
            .collect();
        println!("{}", self.render(&titles));
        println!("{}", "-".repeat(self.width()));
    }

    pub fn print_row(&self, cells: &[String]) {
        println!("{}", self.render(cells));
    }

    fn width(&self) -> usize {
        let cells: usize = self.columns.iter().map(|(_, width, _)| width).sum();
        cells + self.columns.len().saturating_sub(1)
    }

    fn render(&self, cells: &[String]) -> String {
        self.columns
            .iter()
            .zip(cells)
            .map(|((_, width, align), cell)| pad_str(cell, *width, *align, None).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
