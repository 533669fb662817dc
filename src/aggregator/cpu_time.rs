//! Per-thread CPU time from scheduler switches.

use crate::data_model::{CpuTimeDataModel, SchedSwitch};
use serde::Serialize;
use std::collections::BTreeMap;

/// One contiguous slice of a thread running on a core
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusyInterval {
    pub tid: i64,
    pub cpu_id: u32,
    pub start_timestamp: u64,
    pub duration: u64,
}

/// Busy intervals of every thread, per core then time
///
/// **Public** - the raw slices behind [`get_time_per_thread`]
///
/// # Algorithm
/// 1. Group switches by core and sort each group by timestamp
/// 2. The thread switched in at one switch runs until the next switch on
///    the same core
/// 3. The last switch on each core opens an interval with no known end,
///    which is left out
pub fn get_busy_intervals(model: &CpuTimeDataModel) -> Vec<BusyInterval> {
    let mut per_core: BTreeMap<u32, Vec<&SchedSwitch>> = BTreeMap::new();
    for switch in &model.switches {
        per_core.entry(switch.cpu_id).or_default().push(switch);
    }

    let mut intervals = Vec::new();
    for (cpu_id, mut switches) in per_core {
        // Stable, so equal timestamps keep arrival order
        switches.sort_by_key(|s| s.timestamp);
        intervals.extend(switches.windows(2).map(|pair| BusyInterval {
            tid: pair[0].next_tid,
            cpu_id,
            start_timestamp: pair[0].timestamp,
            duration: pair[1].timestamp - pair[0].timestamp,
        }));
    }
    intervals
}

/// Total running time per thread, in nanoseconds
///
/// **Public** - main CPU time query
pub fn get_time_per_thread(model: &CpuTimeDataModel) -> BTreeMap<i64, u64> {
    let mut totals = BTreeMap::new();
    for interval in get_busy_intervals(model) {
        *totals.entry(interval.tid).or_insert(0) += interval.duration;
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::{CpuTimeBuilder, ModelBuilder};
    use pretty_assertions::assert_eq;

    fn switch(timestamp: u64, cpu_id: u32, prev_tid: i64, next_tid: i64) -> SchedSwitch {
        SchedSwitch {
            timestamp,
            cpu_id,
            prev_tid,
            next_tid,
            prev_state: None,
        }
    }

    #[test]
    fn test_trailing_interval_excluded() {
        let mut builder = CpuTimeBuilder::default();
        builder.add_switch(switch(0, 0, 0, 1));
        builder.add_switch(switch(5, 0, 1, 2));
        builder.add_switch(switch(12, 0, 2, 1));
        let model = builder.build();

        let totals = get_time_per_thread(&model);
        assert_eq!(totals, BTreeMap::from([(1, 5), (2, 7)]));
    }

    #[test]
    fn test_cores_are_independent_and_sorted() {
        let mut builder = CpuTimeBuilder::default();
        builder.add_switch(switch(10, 1, 0, 3));
        builder.add_switch(switch(0, 0, 0, 1));
        builder.add_switch(switch(4, 1, 0, 4));
        builder.add_switch(switch(20, 0, 1, 0));
        builder.add_switch(switch(30, 1, 3, 0));
        let model = builder.build();

        let intervals = get_busy_intervals(&model);
        assert_eq!(intervals.len(), 3);
        assert_eq!(intervals[0], BusyInterval { tid: 1, cpu_id: 0, start_timestamp: 0, duration: 20 });
        assert_eq!(intervals[1].tid, 4);
        assert_eq!(intervals[1].duration, 6);
        assert_eq!(intervals[2].tid, 3);
        assert_eq!(intervals[2].duration, 20);
    }
}
