//! garden-cache - offline asset cache for the digital garden
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use garden_cache::cli::args::{ConfigAction, ConfigArgs};
use garden_cache::cli::{commands, Cli, Commands};
use garden_cache::config::{Config, ConfigManager};
use garden_cache::error::GardenResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> GardenResult<()> {
    let cli = Cli::parse();

    // Completions need neither config nor logging
    if let Commands::Completions { shell } = cli.command {
        commands::completions(shell);
        return Ok(());
    }

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Path and init must work even when the existing file is broken
    let skip_load = matches!(
        &cli.command,
        Commands::Config(ConfigArgs {
            action: Some(ConfigAction::Path | ConfigAction::Init { .. }),
        })
    );
    let config = if skip_load {
        Config::default()
    } else {
        config_manager.load().await?
    };

    init_tracing(cli.verbose, &config);
    debug!("Using configuration at {}", config_manager.path().display());

    match cli.command {
        Commands::Install => commands::install(&config).await,
        Commands::Activate => commands::activate(&config).await,
        Commands::Deploy => commands::deploy(&config).await,
        Commands::Fetch(args) => commands::fetch(args, &config).await,
        Commands::Generations(args) => commands::generations(args, &config).await,
        Commands::Purge(args) => commands::purge(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
        Commands::Completions { .. } => unreachable!("Completions handled above"),
    }
}

/// Initialize logging: 0 = warn (spinners only), 1 = info, 2+ = debug
fn init_tracing(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("garden_cache=warn"),
        1 => EnvFilter::new("garden_cache=info"),
        _ => EnvFilter::new("garden_cache=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
