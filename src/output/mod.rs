//! Report building and rendering.
//!
//! Reports are built from finalized handlers and printed as text or JSON;
//! nothing computed here is persisted unless `--output` is given.

pub mod json;
pub mod report;
pub mod text;

pub use json::{report_to_string, write_report, write_report_file};
pub use report::{
    build_report, AnalysisReport, CallbackReport, CpuTimeReport, MemoryReport, ProfileReport,
    Ros2Report, ThreadMemory, ThreadProfile, ThreadTime,
};
pub use text::render_text;
