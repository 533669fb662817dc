//! Analysis report assembled from finalized handlers.

use crate::aggregator::{
    build_collapsed_stacks, calculate_hot_paths, calculate_time_distribution, get_busy_intervals,
    get_call_trees, get_callback_durations, get_callback_objects, get_callback_owner_info,
    get_callback_symbols, get_peak_memory_usage, get_time_per_thread, HotPath, TimeDistribution,
};
use crate::data_model::{
    Anomaly, CpuTimeDataModel, MemoryUsageDataModel, ProfileDataModel, Ros2DataModel,
};
use crate::processor::{HandlerSet, ProcessSummary};
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::time::{format_timestamp, ns_to_ms};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything printed by the `process` command
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub version: String,
    pub source: String,
    pub generated_at: String,
    pub summary: ProcessSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ros2: Option<Ros2Report>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_time: Option<CpuTimeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ust_memory: Option<MemoryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_memory: Option<MemoryReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ros2Report {
    pub nodes: usize,
    pub publishers: usize,
    pub subscriptions: usize,
    pub services: usize,
    pub clients: usize,
    pub timers: usize,
    /// Publish calls, across the rclcpp, rcl and rmw layers
    pub publishes: usize,
    /// Take calls, across the rmw, rcl and rclcpp layers
    pub takes: usize,
    pub callbacks: Vec<CallbackReport>,
    pub anomalies: Vec<Anomaly>,
    pub duplicate_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallbackReport {
    pub callback_object: String,
    /// Creation timestamp of this callback object version
    pub created_at: u64,
    pub symbol: Option<String>,
    pub owner: Option<String>,
    pub first_start: Option<String>,
    pub instances: usize,
    pub incomplete: usize,
    pub total_ms: f64,
    pub mean_ms: Option<f64>,
    pub max_ms: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadTime {
    pub tid: i64,
    pub time_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuTimeReport {
    pub intervals: usize,
    /// Sorted by time, busiest first
    pub threads: Vec<ThreadTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadMemory {
    pub tid: i64,
    pub samples: usize,
    pub allocated_bytes: u64,
    pub peak_bytes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryReport {
    pub threads: Vec<ThreadMemory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadProfile {
    pub tid: i64,
    pub calls: usize,
    pub open_calls: usize,
    pub unmatched_exits: usize,
    pub total_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub threads: Vec<ThreadProfile>,
    pub distribution: TimeDistribution,
    pub hot_paths: Vec<HotPath>,
}

/// Build the report from a processed handler set
///
/// **Public** - main entry point for reporting
///
/// # Arguments
/// * `handlers` - Handlers after a successful pass
/// * `summary` - Summary returned by the processor
/// * `source` - Name of the event file, for display
/// * `top_n` - Number of hot paths (and callbacks) to include
pub fn build_report(
    handlers: &HandlerSet,
    summary: ProcessSummary,
    source: &str,
    top_n: usize,
) -> AnalysisReport {
    AnalysisReport {
        version: SCHEMA_VERSION.to_string(),
        source: source.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        summary,
        ros2: handlers
            .ros2
            .as_ref()
            .and_then(|h| h.data())
            .map(|m| ros2_report(m, top_n)),
        cpu_time: handlers
            .cpu_time
            .as_ref()
            .and_then(|h| h.data())
            .map(cpu_time_report),
        ust_memory: handlers
            .ust_memory
            .as_ref()
            .and_then(|h| h.data())
            .map(memory_report),
        kernel_memory: handlers
            .kernel_memory
            .as_ref()
            .and_then(|h| h.data())
            .map(memory_report),
        profile: handlers
            .profile
            .as_ref()
            .and_then(|h| h.data())
            .map(|m| profile_report(m, top_n)),
    }
}

/// **Private** - callbacks ranked by total execution time
fn ros2_report(model: &Ros2DataModel, top_n: usize) -> Ros2Report {
    let symbols = get_callback_symbols(model);

    let mut callbacks: Vec<(u64, CallbackReport)> = get_callback_objects(model)
        .into_iter()
        .map(|key| {
            let durations = get_callback_durations(model, key);
            let first_start = model
                .callback_instances
                .iter()
                .find(|i| i.callback.resolved == Some(key))
                .and_then(|i| i.start_timestamp)
                .map(format_timestamp);
            let report = CallbackReport {
                callback_object: format!("0x{:x}", key.handle),
                created_at: key.created_at,
                symbol: symbols.get(&key).cloned(),
                owner: get_callback_owner_info(model, key).map(|o| o.to_string()),
                first_start,
                instances: durations.durations.len(),
                incomplete: durations.incomplete,
                total_ms: ns_to_ms(durations.total()),
                mean_ms: durations.mean().map(|m| m / 1_000_000.0),
                max_ms: durations.max().map(ns_to_ms),
            };
            (durations.total(), report)
        })
        .collect();
    // Stable: equal totals keep first-seen order
    callbacks.sort_by(|a, b| b.0.cmp(&a.0));

    Ros2Report {
        nodes: model.nodes.len(),
        publishers: model.publishers.len(),
        subscriptions: model.subscriptions.len(),
        services: model.services.len(),
        clients: model.clients.len(),
        timers: model.timers.len(),
        publishes: model.publish_instances.len(),
        takes: model.take_instances.len(),
        callbacks: callbacks.into_iter().take(top_n).map(|(_, c)| c).collect(),
        anomalies: model.anomalies(),
        duplicate_rows: model.duplicate_rows,
    }
}

fn cpu_time_report(model: &CpuTimeDataModel) -> CpuTimeReport {
    let mut threads: Vec<(i64, u64)> = get_time_per_thread(model).into_iter().collect();
    threads.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    CpuTimeReport {
        intervals: get_busy_intervals(model).len(),
        threads: threads
            .into_iter()
            .map(|(tid, time)| ThreadTime {
                tid,
                time_ms: ns_to_ms(time),
            })
            .collect(),
    }
}

fn memory_report(model: &MemoryUsageDataModel) -> MemoryReport {
    let peaks = get_peak_memory_usage(model);

    let mut per_thread: BTreeMap<i64, (usize, u64)> = BTreeMap::new();
    for sample in &model.samples {
        let entry = per_thread.entry(sample.tid).or_default();
        entry.0 += 1;
        entry.1 = sample.value;
    }

    MemoryReport {
        threads: per_thread
            .into_iter()
            .map(|(tid, (samples, allocated_bytes))| ThreadMemory {
                tid,
                samples,
                allocated_bytes,
                peak_bytes: peaks.get(&tid).copied().unwrap_or(0),
            })
            .collect(),
    }
}

fn profile_report(model: &ProfileDataModel, top_n: usize) -> ProfileReport {
    let trees = get_call_trees(model);
    let stacks = build_collapsed_stacks(trees.values());
    let distribution = calculate_time_distribution(&stacks);
    let hot_paths = calculate_hot_paths(&stacks, distribution.total_time, top_n);

    ProfileReport {
        threads: trees
            .values()
            .map(|tree| ThreadProfile {
                tid: tree.tid,
                calls: tree.nodes.len(),
                open_calls: tree.nodes.iter().filter(|n| !n.is_complete()).count(),
                unmatched_exits: tree.unmatched_exits,
                total_ms: ns_to_ms(tree.total_duration()),
            })
            .collect(),
        distribution,
        hot_paths,
    }
}
