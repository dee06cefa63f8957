//! Shellcache - offline application shell cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use shellcache::cli::{Cli, Commands, LogFormat};
use shellcache::config::ConfigManager;
use shellcache::error::ShellcacheResult;
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

async fn run() -> ShellcacheResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("shellcache=warn"),
        1 => EnvFilter::new("shellcache=info"),
        _ => EnvFilter::new("shellcache=debug"),
    };

    // stderr keeps `fetch` bodies on stdout clean
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Text => subscriber.with_target(false).without_time().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let mut config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    if let Some(ref dir) = cli.state_dir {
        config_manager = config_manager.with_state_dir(dir.clone());
    }
    debug!("Config file: {}", config_manager.path().display());

    let config = config_manager.load().await?;

    // Config commands don't touch the state directory
    if let Commands::Config(args) = cli.command {
        return shellcache::cli::commands::config(args, &config, &config_manager).await;
    }

    config_manager.ensure_state_dir().await?;

    match cli.command {
        Commands::Config(_) => unreachable!("Config handled above"),
        Commands::Install => shellcache::cli::commands::install(&config, &config_manager).await,
        Commands::Activate => shellcache::cli::commands::activate(&config, &config_manager).await,
        Commands::Update => shellcache::cli::commands::update(&config, &config_manager).await,
        Commands::Fetch(args) => {
            shellcache::cli::commands::fetch(args, &config, &config_manager).await
        }
        Commands::Status => shellcache::cli::commands::status(&config, &config_manager).await,
        Commands::Buckets(args) => {
            shellcache::cli::commands::buckets(args, &config, &config_manager).await
        }
    }
}
