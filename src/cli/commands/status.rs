//! Status command - configured shell, generations and buckets

use crate::config::{Config, ConfigManager};
use crate::error::ShellcacheResult;
use crate::host::Host;
use crate::ui::{self, UiContext};
use crate::worker::WorkerState;
use console::style;

/// Execute the status command
pub async fn execute(config: &Config, manager: &ConfigManager) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let host = Host::new(config, manager);

    ui::intro(&ctx, "shellcache status");

    ui::key_value(&ctx, "Config", &manager.path().display().to_string());
    ui::key_value(&ctx, "State", &manager.state_dir().display().to_string());
    ui::key_value(&ctx, "Bucket", &config.worker.bucket_name);
    ui::key_value(&ctx, "Origin", &config.worker.origin);
    ui::key_value(&ctx, "Assets", &config.worker.assets.len().to_string());
    ui::key_value(
        &ctx,
        "Matching",
        if config.matching.is_exact() {
            "exact"
        } else {
            "relaxed"
        },
    );

    let registration = host.registry().load().await?;
    println!();
    if registration.generations.is_empty() {
        ui::step_info(&ctx, "No generations registered");
    } else {
        println!("{}", style("Generations").bold());
        for record in &registration.generations {
            let marker = if registration.controller == Some(record.id) {
                "*"
            } else {
                " "
            };
            println!(
                " {} {:<10} {:<24} {} {}",
                marker,
                record.short_id(),
                record.bucket_name,
                colored_state(record.state),
                record.updated_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }

    let buckets = host.bucket_summary().await?;
    println!();
    if buckets.is_empty() {
        ui::step_info(&ctx, "No cache buckets");
    } else {
        println!("{}", style("Buckets").bold());
        for (name, count) in buckets {
            println!("   {:<24} {} entries", name, count);
        }
    }

    Ok(())
}

fn colored_state(state: WorkerState) -> String {
    let label = format!("{:<11}", state.to_string());
    match state {
        WorkerState::Active => style(label).green().to_string(),
        WorkerState::Installed => style(label).cyan().to_string(),
        WorkerState::Redundant => style(label).dim().to_string(),
        _ => style(label).yellow().to_string(),
    }
}
