//! Deploy command - install then activate

use crate::cli::commands::activate::print_report;
use crate::cli::commands::{agent, store_manager_with_progress};
use crate::config::Config;
use crate::error::GardenResult;
use crate::host::Host;
use crate::ui::{self, FetchProgress, UiContext};
use std::sync::Arc;

/// Execute the deploy command
pub async fn execute(config: &Config) -> GardenResult<()> {
    let ctx = UiContext::detect();
    let generation = config.generation_tag()?;

    ui::intro(&ctx, "garden-cache deploy");
    ui::key_value(&ctx, "generation", generation.as_str());
    ui::key_value(&ctx, "origin", &config.origin.base_url);

    let progress = Arc::new(FetchProgress::new(
        &ctx,
        generation.as_str(),
        config.manifest()?.len(),
    ));
    let manager = store_manager_with_progress(config, Arc::clone(&progress))?;
    let host = Host::new(manager.clone());
    let result = host.deploy(agent(config, manager)?).await;
    progress.finish();

    let (installed, activated) = match result {
        Ok(reports) => reports,
        Err(e) => {
            ui::step_error(&ctx, &format!("Deployment of {} failed", generation));
            return Err(e);
        }
    };

    ui::step_ok_detail(
        &ctx,
        &format!("Captured {} assets", installed.entries),
        generation.as_str(),
    );
    print_report(&ctx, &activated);

    ui::outro_success(&ctx, &format!("{} is active", generation));
    Ok(())
}
