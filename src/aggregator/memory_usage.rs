//! Memory usage series per thread.

use crate::data_model::MemoryUsageDataModel;
use serde::Serialize;
use std::collections::BTreeMap;

/// Change between two consecutive counter samples of a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum MemoryDelta {
    Change { timestamp: u64, bytes: u64 },
    /// The counter went backwards (reset or wrap); no usage is inferred
    Reset { timestamp: u64 },
}

impl MemoryDelta {
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::Change { timestamp, .. } | Self::Reset { timestamp } => *timestamp,
        }
    }
}

/// Deltas between consecutive counter samples, per thread
///
/// **Public** - main memory query
///
/// A thread's first sample only sets the baseline. For models built by the
/// memory handlers the counter is the cumulative allocation counter, so each
/// delta is the number of bytes newly allocated and a free yields zero. A
/// counter that goes backwards (a wrapped counter, or raw tracer samples)
/// becomes a [`MemoryDelta::Reset`].
pub fn get_memory_usage(model: &MemoryUsageDataModel) -> BTreeMap<i64, Vec<MemoryDelta>> {
    let mut previous: BTreeMap<i64, u64> = BTreeMap::new();
    let mut deltas: BTreeMap<i64, Vec<MemoryDelta>> = BTreeMap::new();

    for sample in &model.samples {
        if let Some(last) = previous.insert(sample.tid, sample.value) {
            let delta = match sample.value.checked_sub(last) {
                Some(bytes) => MemoryDelta::Change {
                    timestamp: sample.timestamp,
                    bytes,
                },
                None => MemoryDelta::Reset {
                    timestamp: sample.timestamp,
                },
            };
            deltas.entry(sample.tid).or_default().push(delta);
        }
    }
    deltas
}

/// One point of an absolute usage step series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsagePoint {
    pub timestamp: u64,
    pub memory_usage: i64,
}

/// Live memory over time per thread, as a step series
///
/// Each sample contributes two points at its timestamp: the usage before
/// and after the change.
pub fn get_absolute_memory_usage_by_tid(model: &MemoryUsageDataModel) -> BTreeMap<i64, Vec<UsagePoint>> {
    let mut current: BTreeMap<i64, i64> = BTreeMap::new();
    let mut series: BTreeMap<i64, Vec<UsagePoint>> = BTreeMap::new();

    for sample in &model.samples {
        let usage = current.entry(sample.tid).or_insert(0);
        let before = *usage;
        *usage = before.saturating_add(sample.diff);
        let points = series.entry(sample.tid).or_default();
        points.push(UsagePoint {
            timestamp: sample.timestamp,
            memory_usage: before,
        });
        points.push(UsagePoint {
            timestamp: sample.timestamp,
            memory_usage: *usage,
        });
    }
    series
}

/// Highest live usage reached per thread
pub fn get_peak_memory_usage(model: &MemoryUsageDataModel) -> BTreeMap<i64, i64> {
    get_absolute_memory_usage_by_tid(model)
        .into_iter()
        .map(|(tid, points)| {
            let peak = points.iter().map(|p| p.memory_usage).max().unwrap_or(0);
            (tid, peak)
        })
        .collect()
}
