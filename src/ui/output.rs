//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::style;

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.is_interactive() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        println!("{}", style(title).cyan().bold());
    }
}

/// Display success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        println!("{} {}", style("[OK]").green(), message);
    }
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::success(message).ok();
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

/// Display a warning step with detail
pub fn step_warn_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.is_interactive() {
        cliclack::log::warning(format!("{} ({})", message, style(detail).dim())).ok();
    } else {
        println!("  {} {} ({})", style("[WARN]").yellow(), message, detail);
    }
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::info(message).ok();
    } else {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

/// Print a key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.is_interactive() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Ask for confirmation; `--yes` and non-interactive runs skip the prompt
pub fn confirm(ctx: &UiContext, message: &str) -> bool {
    if ctx.auto_yes() {
        return true;
    }
    if !ctx.is_interactive() {
        return false;
    }
    cliclack::confirm(message)
        .initial_value(false)
        .interact()
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_non_interactive() {
        let ctx = UiContext::non_interactive();
        intro(&ctx, "Test");
        step_ok(&ctx, "Step completed");
        step_warn_detail(&ctx, "Warning", "detail");
        step_info(&ctx, "Info");
        key_value(&ctx, "bucket", "v1");
        outro_success(&ctx, "Done");
    }

    #[test]
    fn confirm_without_terminal() {
        assert!(!confirm(&UiContext::non_interactive(), "Delete?"));
        assert!(confirm(&UiContext::non_interactive().with_auto_yes(true), "Delete?"));
    }
}
