//! Terminal output for the garden-cache CLI
//!
//! Uses `cliclack` for styled steps and prompts when attached to a terminal
//! and falls back to plain `[OK]`/`[FAIL]` lines in CI and pipes.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_error, outro_success, remark, section, source_label, state_label,
    step_error, step_info, step_ok, step_ok_detail, step_warn, step_warn_hint, Table,
};
pub use progress::{FetchProgress, TaskSpinner};
pub use prompts::confirm;
