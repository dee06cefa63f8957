//! Update command - install and activate in one step

use super::activate::print_activation;
use crate::config::{Config, ConfigManager};
use crate::error::ShellcacheResult;
use crate::host::Host;
use crate::ui::{self, UiContext};

/// Execute the update command
pub async fn execute(config: &Config, manager: &ConfigManager) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let host = Host::new(config, manager);

    ui::intro(&ctx, "Updating application shell");

    let (_, installed) = host.install().await?;
    ui::step_ok(
        &ctx,
        &format!("Cached {} assets in {}", installed.cached, installed.bucket_name),
    );

    let (record, report) = host.activate().await?;
    print_activation(&ctx, &record, &report);

    Ok(())
}
