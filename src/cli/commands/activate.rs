//! Activate command - purge stale generations

use crate::agent::{ActivationReport, AgentState};
use crate::cli::commands::{agent, store_manager};
use crate::config::Config;
use crate::error::GardenResult;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the activate command
pub async fn execute(config: &Config) -> GardenResult<()> {
    let ctx = UiContext::detect();
    let manager = store_manager(config)?;
    let agent = agent(config, manager)?;

    ui::intro(&ctx, "garden-cache activate");

    // Installation ran in an earlier invocation
    agent.restore(AgentState::Installed).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start("Purging stale generations...");
    let report = match agent.on_activate().await {
        Ok(report) => {
            spinner.stop(&format!("{} stale generation(s) removed", report.deleted.len()));
            report
        }
        Err(e) => {
            spinner.stop_error("Activation failed");
            return Err(e);
        }
    };

    print_report(&ctx, &report);
    ui::outro_success(&ctx, &format!("{} is active", report.generation));
    Ok(())
}

pub(crate) fn print_report(ctx: &UiContext, report: &ActivationReport) {
    for tag in &report.deleted {
        ui::step_ok_detail(ctx, "Deleted stale generation", tag.as_str());
    }
    for tag in &report.skipped {
        ui::step_warn_hint(
            ctx,
            &format!("Left {} in place", tag),
            "not owned by this agent",
        );
    }
}
