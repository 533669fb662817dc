//! Trace Analysis CLI
//!
//! Processes converted ROS 2 / kernel traces and prints derived metrics.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use trace_analysis::commands::{
    display_events, display_version, execute_process, validate_args, ProcessArgs,
};
use trace_analysis::processor::HandlerKind;

/// Trace Analysis - data models and metrics from tracing events
#[derive(Parser, Debug)]
#[command(name = "trace-analysis")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Process a converted trace and print a report
    Process {
        /// Converted trace file (one JSON event per line)
        events: PathBuf,

        /// Tolerate required events missing from the trace
        #[arg(long)]
        partial: bool,

        /// TOML configuration file
        #[arg(short, long, env = "TRACE_ANALYSIS_CONFIG")]
        config: Option<PathBuf>,

        /// Handler to run (repeatable); all applicable handlers if omitted
        #[arg(long = "handler", value_enum)]
        handlers: Vec<HandlerKind>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of callbacks and hot paths to include
        #[arg(long, default_value = "20")]
        top: usize,

        /// Events between progress log lines
        #[arg(long)]
        progress_interval: Option<usize>,
    },

    /// List the events each handler consumes
    Events,

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging; logs go to stderr so JSON on stdout stays clean
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Process {
            events,
            partial,
            config,
            handlers,
            json,
            output,
            top,
            progress_interval,
        } => {
            let args = ProcessArgs {
                events_path: events,
                partial,
                config,
                handlers,
                json,
                output,
                top,
                progress_interval,
            };

            // Validate args first
            validate_args(&args)?;

            execute_process(args)?;
        }

        Commands::Events => display_events(),

        Commands::Version => display_version(),
    }

    Ok(())
}
