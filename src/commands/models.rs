use crate::processor::HandlerKind;
use std::path::PathBuf;

/// Arguments for the process command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ProcessArgs {
    /// Converted trace file (JSON lines)
    pub events_path: PathBuf,

    /// Tolerate required events missing from the trace
    pub partial: bool,

    /// Optional TOML configuration file
    pub config: Option<PathBuf>,

    /// Handlers to run; empty means auto-select
    pub handlers: Vec<HandlerKind>,

    /// Print the report as JSON instead of text
    pub json: bool,

    /// Also write the JSON report to this file
    pub output: Option<PathBuf>,

    /// Number of callbacks and hot paths to include
    pub top: usize,

    /// Events between progress log lines, overriding the config file
    pub progress_interval: Option<usize>,
}

impl Default for ProcessArgs {
    fn default() -> Self {
        Self {
            events_path: PathBuf::from("events.jsonl"),
            partial: false,
            config: None,
            handlers: Vec::new(),
            json: false,
            output: None,
            top: 20,
            progress_interval: None,
        }
    }
}
