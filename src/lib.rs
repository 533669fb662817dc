//! Trace Analysis
//!
//! Turns a chronological stream of tracing events (ROS 2 tracepoints,
//! kernel scheduler and memory events, function instrumentation) into
//! typed data models, and derives metrics from the finalized models.
//!
//! ## Pipeline
//!
//! ```text
//! loader -> Processor -> {handler, ...} -> finalized data models -> aggregator queries
//! ```
//!
//! ```ignore
//! use trace_analysis::parser::load_file;
//! use trace_analysis::processor::{CoverageMode, CpuTimeHandler, Processor};
//! use trace_analysis::aggregator::get_time_per_thread;
//!
//! let trace = load_file("events.jsonl")?;
//! let mut cpu = CpuTimeHandler::new();
//! Processor::new(vec![&mut cpu], CoverageMode::Strict)?.process(&trace)?;
//! let per_thread = get_time_per_thread(cpu.data().unwrap());
//! ```
//!
//! Most users should run the CLI:
//!
//! ```bash
//! trace-analysis process events.jsonl
//! trace-analysis events
//! ```

pub mod aggregator;
pub mod commands;
pub mod data_model;
pub mod output;
pub mod parser;
pub mod processor;
pub mod utils;
