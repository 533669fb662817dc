//! Process command implementation.
//!
//! The process command:
//! 1. Loads the optional configuration file
//! 2. Loads the converted trace
//! 3. Selects handlers (explicit or auto-selected)
//! 4. Runs one processing pass
//! 5. Builds the report
//! 6. Prints it (and optionally writes it to a file)

use super::models::ProcessArgs;
use crate::output::{build_report, render_text, write_report, write_report_file, AnalysisReport};
use crate::parser::{load_file, EventSource};
use crate::processor::{CoverageMode, HandlerSet, LogProgress, Processor};
use crate::utils::config::{load_config, AnalysisConfig};
use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;

/// Execute the process command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Config or trace file cannot be read
/// * No handler applies to the trace
/// * The processing pass fails (missing required event in strict mode,
///   malformed event)
/// * The report cannot be written
pub fn execute_process(args: ProcessArgs) -> Result<()> {
    let start_time = Instant::now();

    let report = run_analysis(&args)?;

    info!("Step 6/6: Writing report...");
    if args.json {
        write_report(&report, std::io::stdout().lock()).context("Failed to print JSON report")?;
    } else {
        println!("{}", render_text(&report));
    }

    if let Some(path) = &args.output {
        write_report_file(&report, path).context("Failed to write JSON report")?;
        info!("✓ Report written to: {}", path.display());
    }

    info!(
        "Analysis completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Run steps 1-5 and return the report without printing it
///
/// **Public** - used by execute_process and the integration tests
pub fn run_analysis(args: &ProcessArgs) -> Result<AnalysisReport> {
    info!("Step 1/6: Loading configuration...");
    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };
    let mode = resolve_mode(args.partial, &config);
    let symbols = config
        .symbol_map()
        .context("Invalid symbol table in config")?;
    debug!("Coverage mode: {:?}, {} symbol(s)", mode, symbols.len());

    info!("Step 2/6: Loading trace {}...", args.events_path.display());
    let trace = load_file(&args.events_path)
        .with_context(|| format!("Failed to load trace {}", args.events_path.display()))?;

    info!("Step 3/6: Selecting handlers...");
    let mut handlers = if args.handlers.is_empty() {
        HandlerSet::applicable(&trace.event_names(), symbols)
    } else {
        HandlerSet::from_kinds(&args.handlers, symbols)
    };
    if handlers.is_empty() {
        anyhow::bail!(
            "No handler applies to this trace; name one with --handler (see `events`)"
        );
    }

    info!("Step 4/6: Processing events...");
    let interval = args
        .progress_interval
        .filter(|n| *n > 0)
        .unwrap_or_else(|| config.progress_interval());
    let summary = Processor::new(handlers.as_handlers(), mode)?
        .with_progress(LogProgress::new(interval))
        .process(&trace)
        .context("Failed to process trace")?;

    info!("Step 5/6: Building report...");
    let source = args.events_path.display().to_string();
    Ok(build_report(&handlers, summary, &source, args.top))
}

/// Coverage mode from the `--partial` flag, then the config file
///
/// Strict unless something asks for partial.
pub fn resolve_mode(partial: bool, config: &AnalysisConfig) -> CoverageMode {
    if partial {
        CoverageMode::Partial
    } else {
        config.mode.unwrap_or(CoverageMode::Strict)
    }
}

/// Validate process arguments
///
/// **Public** - can be called before execute_process for early validation
pub fn validate_args(args: &ProcessArgs) -> Result<()> {
    if !args.events_path.is_file() {
        anyhow::bail!("Trace file not found: {}", args.events_path.display());
    }

    if let Some(config) = &args.config {
        if !config.is_file() {
            anyhow::bail!("Config file not found: {}", config.display());
        }
    }

    if args.top == 0 {
        anyhow::bail!("top must be greater than 0");
    }

    if args.top > 1000 {
        anyhow::bail!("top is too large (max 1000)");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn trace_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"name": "sched_switch", "timestamp": 1, "fields": {{"cpu_id": 0, "prev_tid": 0, "next_tid": 7}}}}"#).unwrap();
        file
    }

    #[test]
    fn test_validate_args_valid() {
        let file = trace_file();
        let args = ProcessArgs {
            events_path: file.path().to_path_buf(),
            ..Default::default()
        };
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_missing_trace() {
        let args = ProcessArgs {
            events_path: "does/not/exist.jsonl".into(),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_top_bounds() {
        let file = trace_file();
        for top in [0, 2000] {
            let args = ProcessArgs {
                events_path: file.path().to_path_buf(),
                top,
                ..Default::default()
            };
            assert!(validate_args(&args).is_err(), "top = {}", top);
        }
    }

    #[test]
    fn test_resolve_mode_precedence() {
        let partial = AnalysisConfig {
            mode: Some(CoverageMode::Partial),
            ..Default::default()
        };
        assert_eq!(resolve_mode(false, &AnalysisConfig::default()), CoverageMode::Strict);
        assert_eq!(resolve_mode(false, &partial), CoverageMode::Partial);
        assert_eq!(resolve_mode(true, &AnalysisConfig::default()), CoverageMode::Partial);
    }
}
