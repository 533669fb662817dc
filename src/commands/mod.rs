//! CLI command implementations.
//!
//! Commands orchestrate the library components: load, process, report.

pub mod models;
pub mod process;
pub mod utils;

// Re-export main command functions
pub use models::ProcessArgs;
pub use process::{execute_process, resolve_mode, run_analysis, validate_args};
pub use utils::{display_events, display_version};
