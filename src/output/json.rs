//! JSON report writer.

use super::report::AnalysisReport;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a report as pretty-printed JSON
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
pub fn write_report(report: &AnalysisReport, writer: impl Write) -> Result<(), OutputError> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a report to a JSON file, creating parent directories
///
/// **Public** - used by `process --output`
///
/// # Errors
/// * `OutputError::InvalidPath` - Path is empty or a directory
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
pub fn write_report_file(
    report: &AnalysisReport,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();
    info!("Writing report to: {}", output_path.display());

    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent)?;
        }
    }

    write_report(report, File::create(output_path)?)
}

/// Serialize a report into a string
pub fn report_to_string(report: &AnalysisReport) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// **Private** - reject paths that cannot hold a file
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }
    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{CoverageMode, ProcessSummary};
    use crate::utils::config::SCHEMA_VERSION;

    fn empty_report() -> AnalysisReport {
        AnalysisReport {
            version: SCHEMA_VERSION.to_string(),
            source: "trace.jsonl".to_string(),
            generated_at: "2024-01-01T00:00:00+00:00".to_string(),
            summary: ProcessSummary {
                mode: CoverageMode::Partial,
                handlers: vec!["cpu_time".to_string()],
                events_total: 3,
                events_dispatched: 2,
                missing_events: Vec::new(),
            },
            ros2: None,
            cpu_time: None,
            ust_memory: None,
            kernel_memory: None,
            profile: None,
        }
    }

    #[test]
    fn test_report_to_string_skips_absent_sections() {
        let json = report_to_string(&empty_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["mode"], "partial");
        assert_eq!(value["summary"]["events_total"], 3);
        assert!(value.get("ros2").is_none());
    }

    #[test]
    fn test_write_report_file_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("nested/dirs/report.json");

        write_report_file(&empty_report(), &nested).unwrap();

        let contents = std::fs::read_to_string(&nested).unwrap();
        assert!(contents.contains("\"source\": \"trace.jsonl\""));
    }

    #[test]
    fn test_write_report_file_rejects_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = write_report_file(&empty_report(), temp_dir.path());
        assert!(matches!(result, Err(OutputError::InvalidPath(_))));
    }
}
