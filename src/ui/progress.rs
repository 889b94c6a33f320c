//! Spinners and progress bars for lifecycle phases, with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner that degrades to plain lines outside a terminal
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Progress bar for generation population.
///
/// Shows an indicatif bar in interactive mode, one line per asset in CI.
pub struct FetchProgress {
    bar: Option<ProgressBar>,
}

impl FetchProgress {
    pub fn new(ctx: &UiContext, generation: &str, total: usize) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total as u64);
            if let Ok(template) = ProgressStyle::default_bar().template(
                "  {spinner:.cyan} Populating {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}",
            ) {
                bar.set_style(template.progress_chars("━╸─"));
            }
            bar.set_prefix(generation.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Populating {} ({} assets)...", generation, total);
            None
        };
        Self { bar }
    }

    /// Record one fetched asset
    pub fn on_fetched(&self, asset: &str, status: u16) {
        match self.bar {
            Some(ref bar) => {
                bar.inc(1);
                bar.set_message(asset.to_string());
            }
            None => println!("  {} {}", status, asset),
        }
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
