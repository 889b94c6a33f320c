//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{GardenError, GardenResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.audit_log",
    "agent.generation",
    "agent.owner_prefix",
    "origin.base_url",
    "origin.timeout_secs",
    "store.path",
    "manifest.assets",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> GardenResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => show_path(manager),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> GardenResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn show_path(manager: &ConfigManager) {
    println!("{}", manager.path().display());
}

async fn init_config(manager: &ConfigManager, force: bool) -> GardenResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;

    ui::step_ok_detail(
        &ctx,
        "Configuration initialized",
        &path.display().to_string(),
    );

    Ok(())
}

async fn set_value(
    manager: &ConfigManager,
    config: &Config,
    key: &str,
    value: &str,
) -> GardenResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply(&mut config, key, value) {
        ui::step_error(&ctx, &e.to_string());
        ui::remark(&ctx, "Valid keys:");
        for key in VALID_KEYS {
            eprintln!("  {}", key);
        }
        return Err(e);
    }

    config.validate(manager.path())?;
    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Assign a dot-separated key
fn apply(config: &mut Config, key: &str, value: &str) -> GardenResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => config.general.log_format = value.to_string(),
        ["general", "audit_log"] => config.general.audit_log = parse_bool(value)?,

        ["agent", "generation"] => config.agent.generation = value.to_string(),
        ["agent", "owner_prefix"] => config.agent.owner_prefix = value.to_string(),

        ["origin", "base_url"] => config.origin.base_url = value.to_string(),
        ["origin", "timeout_secs"] => config.origin.timeout_secs = parse_u64(value)?,

        ["store", "path"] => {
            config.store.path = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            }
        }

        ["manifest", "assets"] => {
            config.manifest.assets = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        _ => return Err(GardenError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_bool(value: &str) -> GardenResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(GardenError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u64(value: &str) -> GardenResult<u64> {
    value
        .parse()
        .map_err(|_| GardenError::User(format!("Invalid number: {}", value)))
}
