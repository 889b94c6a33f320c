//! Install command - populate the current generation

use crate::cli::commands::{agent, store_manager_with_progress};
use crate::config::Config;
use crate::error::GardenResult;
use crate::host::Host;
use crate::ui::{self, FetchProgress, UiContext};
use std::sync::Arc;

/// Execute the install command
pub async fn execute(config: &Config) -> GardenResult<()> {
    let ctx = UiContext::detect();
    let generation = config.generation_tag()?;

    ui::intro(&ctx, "garden-cache install");
    ui::key_value(&ctx, "generation", generation.as_str());
    ui::key_value(&ctx, "origin", &config.origin.base_url);

    let progress = Arc::new(FetchProgress::new(
        &ctx,
        generation.as_str(),
        config.manifest()?.len(),
    ));
    let manager = store_manager_with_progress(config, Arc::clone(&progress))?;
    ui::key_value(&ctx, "store", manager.registry().backend_name());
    let host = Host::new(manager.clone());
    let result = host.register(agent(config, manager)?).await;
    progress.finish();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            ui::step_error(&ctx, &format!("Installation of {} failed", generation));
            return Err(e);
        }
    };

    ui::step_ok_detail(
        &ctx,
        &format!("Captured {} assets", report.entries),
        generation.as_str(),
    );
    if report.reinstalled {
        ui::step_warn(&ctx, "Generation already existed and was rewritten");
    }
    ui::outro_success(
        &ctx,
        &format!("Installed {}, run `garden-cache activate` to serve it", generation),
    );
    Ok(())
}
