//! Terminal output helpers
//!
//! Uses `cliclack` frames in an interactive terminal and falls back to plain
//! `[OK]`/`[WARN]` lines in CI or when piped.

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    confirm, intro, key_value, outro_success, step_info, step_ok, step_warn_detail,
};
