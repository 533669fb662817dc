//! Scheduler switch records.

use super::{ModelBuilder, Table};
use serde::Serialize;

/// One `sched_switch` on a core
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedSwitch {
    pub timestamp: u64,
    pub cpu_id: u32,
    pub prev_tid: i64,
    pub next_tid: i64,
    /// Scheduler state of the outgoing thread, when traced
    pub prev_state: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuTimeDataModel {
    pub switches: Table<SchedSwitch>,
}

#[derive(Debug, Default)]
pub struct CpuTimeBuilder {
    switches: Vec<SchedSwitch>,
}

impl CpuTimeBuilder {
    pub fn add_switch(&mut self, switch: SchedSwitch) {
        self.switches.push(switch);
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }
}

impl ModelBuilder for CpuTimeBuilder {
    type Model = CpuTimeDataModel;

    fn build(self) -> CpuTimeDataModel {
        CpuTimeDataModel {
            switches: self.switches.into(),
        }
    }
}
