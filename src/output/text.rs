//! Plain-text rendering of an analysis report.

use super::report::{AnalysisReport, CpuTimeReport, MemoryReport, ProfileReport, Ros2Report};
use crate::data_model::Anomaly;

const RULE_WIDTH: usize = 80;
const STACK_WIDTH: usize = 48;

/// Render the report as the summary printed by the `process` command
///
/// **Public** - main entry point for text output
pub fn render_text(report: &AnalysisReport) -> String {
    let mut lines = Vec::new();
    let rule = "=".repeat(RULE_WIDTH);

    lines.push(rule.clone());
    lines.push("TRACE ANALYSIS".to_string());
    lines.push(rule.clone());
    lines.push(format!("Source:      {}", report.source));
    lines.push(format!("Mode:        {:?}", report.summary.mode));
    lines.push(format!("Handlers:    {}", report.summary.handlers.join(", ")));
    lines.push(format!(
        "Events:      {} ({} dispatched)",
        report.summary.events_total, report.summary.events_dispatched
    ));
    for gap in &report.summary.missing_events {
        lines.push(format!(
            "Missing:     {} (needed by {})",
            gap.event,
            gap.handlers.join(", ")
        ));
    }

    if let Some(ros2) = &report.ros2 {
        render_ros2(&mut lines, ros2);
    }
    if let Some(cpu) = &report.cpu_time {
        render_cpu_time(&mut lines, cpu);
    }
    if let Some(memory) = &report.ust_memory {
        render_memory(&mut lines, "USERSPACE MEMORY", memory);
    }
    if let Some(memory) = &report.kernel_memory {
        render_memory(&mut lines, "KERNEL MEMORY", memory);
    }
    if let Some(profile) = &report.profile {
        render_profile(&mut lines, profile);
    }

    lines.push(rule);
    lines.join("\n")
}

fn section(lines: &mut Vec<String>, title: &str) {
    lines.push(String::new());
    lines.push(title.to_string());
    lines.push("-".repeat(RULE_WIDTH));
}

fn render_ros2(lines: &mut Vec<String>, ros2: &Ros2Report) {
    section(lines, "ROS 2");
    lines.push(format!(
        "Nodes: {} | Publishers: {} | Subscriptions: {} | Services: {} | Clients: {} | Timers: {}",
        ros2.nodes, ros2.publishers, ros2.subscriptions, ros2.services, ros2.clients, ros2.timers
    ));
    lines.push(format!("Publishes: {} | Takes: {}", ros2.publishes, ros2.takes));

    if !ros2.callbacks.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "  {:<STACK_WIDTH$} {:>8} {:>12} {:>12}",
            "Callback", "Count", "Total (ms)", "Mean (ms)"
        ));
        for callback in &ros2.callbacks {
            let name = callback
                .symbol
                .as_deref()
                .unwrap_or(&callback.callback_object);
            lines.push(format!(
                "  {:<STACK_WIDTH$} {:>8} {:>12.3} {:>12}",
                truncate_left(name, STACK_WIDTH),
                callback.instances,
                callback.total_ms,
                callback
                    .mean_ms
                    .map_or_else(|| "-".to_string(), |m| format!("{:.3}", m))
            ));
            if let Some(owner) = &callback.owner {
                lines.push(format!("    {}", owner));
            }
            if callback.incomplete > 0 {
                lines.push(format!("    {} incomplete instance(s)", callback.incomplete));
            }
        }
    }

    if ros2.duplicate_rows > 0 {
        lines.push(format!("Duplicate rows rejected: {}", ros2.duplicate_rows));
    }
    if !ros2.anomalies.is_empty() {
        let unresolved = ros2
            .anomalies
            .iter()
            .filter(|a| matches!(a, Anomaly::UnresolvedReference { .. }))
            .count();
        lines.push(format!(
            "Anomalies: {} unresolved reference(s), {} pairing issue(s)",
            unresolved,
            ros2.anomalies.len() - unresolved
        ));
    }
}

fn render_cpu_time(lines: &mut Vec<String>, cpu: &CpuTimeReport) {
    section(lines, "CPU TIME");
    lines.push(format!("Busy intervals: {}", cpu.intervals));
    for thread in &cpu.threads {
        lines.push(format!("  tid {:<10} {:>12.3} ms", thread.tid, thread.time_ms));
    }
}

fn render_memory(lines: &mut Vec<String>, title: &str, memory: &MemoryReport) {
    section(lines, title);
    for thread in &memory.threads {
        lines.push(format!(
            "  tid {:<10} samples {:>8} | allocated {:>12} B | peak {:>12} B",
            thread.tid, thread.samples, thread.allocated_bytes, thread.peak_bytes
        ));
    }
}

fn render_profile(lines: &mut Vec<String>, profile: &ProfileReport) {
    section(lines, "PROFILE");
    for thread in &profile.threads {
        lines.push(format!(
            "  tid {:<10} calls {:>8} | open {:>4} | total {:>12.3} ms",
            thread.tid, thread.calls, thread.open_calls, thread.total_ms
        ));
    }
    lines.push(profile.distribution.summary());

    if !profile.hot_paths.is_empty() {
        lines.push(String::new());
        lines.push(format!("  {:<STACK_WIDTH$} {:>14} {:>7}", "Hot path", "Self (ns)", "%"));
        for path in &profile.hot_paths {
            lines.push(format!(
                "  {:<STACK_WIDTH$} {:>14} {:>6.1}%",
                truncate_left(&path.stack, STACK_WIDTH),
                path.time,
                path.percentage
            ));
        }
    }
}

/// Keep the tail of a long name, which holds the innermost frames
fn truncate_left(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - (width - 3)).collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::report::ThreadMemory;
    use crate::processor::{CoverageMode, MissingEvent, ProcessSummary};

    fn report() -> AnalysisReport {
        AnalysisReport {
            version: "1.0.0".to_string(),
            source: "trace.jsonl".to_string(),
            generated_at: String::new(),
            summary: ProcessSummary {
                mode: CoverageMode::Partial,
                handlers: vec!["ust_memory".to_string()],
                events_total: 3,
                events_dispatched: 2,
                missing_events: vec![MissingEvent {
                    event: "lttng_ust_libc:free".to_string(),
                    handlers: vec!["ust_memory".to_string()],
                }],
            },
            ros2: None,
            cpu_time: None,
            ust_memory: Some(MemoryReport {
                threads: vec![ThreadMemory {
                    tid: 3,
                    samples: 2,
                    allocated_bytes: 96,
                    peak_bytes: 96,
                }],
            }),
            kernel_memory: None,
            profile: None,
        }
    }

    #[test]
    fn test_render_sections_as_lines() {
        let text = render_text(&report());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "=".repeat(RULE_WIDTH));
        assert_eq!(lines[1], "TRACE ANALYSIS");
        assert_eq!(lines[4], "Mode:        Partial");
        assert_eq!(lines[6], "Events:      3 (2 dispatched)");
        assert_eq!(lines[7], "Missing:     lttng_ust_libc:free (needed by ust_memory)");
        assert_eq!(lines[8], "");
        assert_eq!(lines[9], "USERSPACE MEMORY");
        assert!(lines[11].starts_with("  tid 3 "));
        assert_eq!(*lines.last().unwrap(), "=".repeat(RULE_WIDTH));
        assert!(!text.ends_with('\n'));
        assert!(!text.contains("CPU TIME"));
    }

    #[test]
    fn test_truncate_left() {
        assert_eq!(truncate_left("main;run", 20), "main;run");
        assert_eq!(truncate_left("abcdefghij", 8), "...fghij");
    }
}
