//! Install command - register a generation and pre-cache the shell

use crate::config::{Config, ConfigManager};
use crate::error::ShellcacheResult;
use crate::host::Host;
use crate::ui::{self, UiContext};

/// Execute the install command
pub async fn execute(config: &Config, manager: &ConfigManager) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let host = Host::new(config, manager);

    ui::intro(&ctx, "Installing application shell");

    let (record, report) = host.install().await?;

    ui::key_value(&ctx, "Generation", &record.short_id());
    ui::key_value(&ctx, "Bucket", &report.bucket_name);
    ui::outro_success(
        &ctx,
        &format!(
            "Cached {} assets; run `shellcache activate` to take over",
            report.cached
        ),
    );

    Ok(())
}
