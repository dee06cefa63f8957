//! Buckets command - inspect or remove cache buckets

use crate::cache::CacheStorage;
use crate::cli::args::{BucketsAction, BucketsArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::host::Host;
use crate::ui::{self, UiContext};

/// Execute the buckets command
pub async fn execute(
    args: BucketsArgs,
    config: &Config,
    manager: &ConfigManager,
) -> ShellcacheResult<()> {
    let host = Host::new(config, manager);

    match args.action {
        BucketsAction::List => list(&host).await,
        BucketsAction::Show { name } => show(&host, &name).await,
        BucketsAction::Delete { name, yes } => delete(&host, &name, yes).await,
    }
}

async fn list(host: &Host) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let buckets = host.bucket_summary().await?;

    if buckets.is_empty() {
        ui::step_info(&ctx, "No cache buckets");
        return Ok(());
    }
    for (name, count) in buckets {
        println!("{:<24} {}", name, count);
    }
    Ok(())
}

async fn show(host: &Host, name: &str) -> ShellcacheResult<()> {
    for key in host.storage().entries(name).await? {
        let status = host
            .storage()
            .get(name, &key)
            .await?
            .map(|response| response.status.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<4} {}", status, key);
    }
    Ok(())
}

async fn delete(host: &Host, name: &str, yes: bool) -> ShellcacheResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    if !host.storage().has(name).await? {
        return Err(ShellcacheError::BucketNotFound(name.to_string()));
    }

    if let Some(active) = host.registry().active().await? {
        if active.bucket_name == name {
            ui::step_warn_detail(
                &ctx,
                &format!("{} belongs to the active generation", name),
                "requests will go to the network until the next install",
            );
        }
    }

    if !ui::confirm(&ctx, &format!("Delete bucket {}?", name)) {
        ui::step_info(&ctx, "Cancelled (pass --yes to skip the prompt)");
        return Ok(());
    }

    if host.delete_bucket(name).await? {
        ui::step_ok(&ctx, &format!("Deleted bucket {}", name));
    }
    Ok(())
}
