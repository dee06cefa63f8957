//! Activate command - promote the waiting generation

use crate::config::{Config, ConfigManager};
use crate::error::ShellcacheResult;
use crate::host::Host;
use crate::registration::GenerationRecord;
use crate::ui::{self, UiContext};
use crate::worker::ActivationReport;

/// Execute the activate command
pub async fn execute(config: &Config, manager: &ConfigManager) -> ShellcacheResult<()> {
    let ctx = UiContext::detect();
    let host = Host::new(config, manager);

    ui::intro(&ctx, "Activating application shell");

    let (record, report) = host.activate().await?;
    print_activation(&ctx, &record, &report);

    Ok(())
}

/// Report deleted buckets, deletion failures and the final controller
pub(super) fn print_activation(
    ctx: &UiContext,
    record: &GenerationRecord,
    report: &ActivationReport,
) {
    for bucket in &report.deleted {
        ui::step_ok(ctx, &format!("Cleared old cache {}", bucket));
    }
    for (bucket, reason) in &report.failed {
        ui::step_warn_detail(ctx, &format!("Could not clear {}", bucket), reason);
    }
    if !report.claimed {
        ui::step_warn_detail(ctx, "Clients not claimed", "they switch over on next start");
    }

    ui::key_value(ctx, "Generation", &record.short_id());
    ui::key_value(ctx, "Bucket", &record.bucket_name);
    ui::outro_success(ctx, "Generation active");
}
