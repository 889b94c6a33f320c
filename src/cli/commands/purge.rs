//! Purge command - delete every owned generation

use crate::audit::AuditLog;
use crate::cli::args::PurgeArgs;
use crate::cli::commands::store_manager;
use crate::config::Config;
use crate::error::{GardenError, GardenResult};
use crate::ui::{self, UiContext};
use tracing::warn;

/// Execute the purge command
pub async fn execute(args: PurgeArgs, config: &Config) -> GardenResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let manager = store_manager(config)?;
    let prefix = &config.agent.owner_prefix;

    let owned: Vec<_> = manager
        .list_tags()
        .await?
        .into_iter()
        .filter(|tag| tag.is_owned_by(prefix))
        .collect();

    if owned.is_empty() {
        ui::step_info(&ctx, "No owned generations to purge");
        return Ok(());
    }

    ui::section(&ctx, "Generations to delete");
    for tag in &owned {
        ui::remark(&ctx, tag.as_str());
    }

    let prompt = format!("Delete {} generation(s)?", owned.len());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step_warn_hint(&ctx, "Purge cancelled", "Use --yes to skip confirmation");
        return Ok(());
    }

    let audit = AuditLog::new(config);
    let mut deleted = 0;
    for tag in &owned {
        match manager.delete(tag).await {
            Ok(_) => {
                deleted += 1;
                audit
                    .log(
                        "generation.deleted",
                        &serde_json::json!({ "generation": tag.as_str(), "reason": "purge" }),
                    )
                    .await;
                ui::step_ok(&ctx, &format!("Deleted {}", tag));
            }
            Err(e) => {
                warn!("Failed to delete {}: {}", tag, e);
                ui::step_error(&ctx, &format!("Failed to delete {}: {}", tag, e));
            }
        }
    }

    if deleted < owned.len() {
        ui::outro_error(&ctx, &format!("Purged {} of {} generation(s)", deleted, owned.len()));
        return Err(GardenError::store(
            "purge",
            format!("{} generation(s) could not be deleted", owned.len() - deleted),
        ));
    }

    ui::outro_success(&ctx, &format!("Purged {} generation(s)", deleted));
    Ok(())
}
