//! Function entry/exit records for call-tree reconstruction.
//!
//! Depth is implicit: the tree is rebuilt from the record order per thread.
//! Scheduler switches of profiled threads are recorded too so on-CPU time
//! can be separated from wall time.

use super::{ModelBuilder, Table};
use crate::parser::Handle;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ProfileRecordKind {
    /// Function entry, with the name resolved at processing time
    Entry { address: Handle, function: String },
    Exit { address: Handle },
    /// The thread was scheduled out
    SwitchOut,
    /// The thread was scheduled back in
    SwitchIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileRecord {
    pub timestamp: u64,
    pub tid: i64,
    #[serde(flatten)]
    pub kind: ProfileRecordKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileDataModel {
    pub records: Table<ProfileRecord>,
}

#[derive(Debug, Default)]
pub struct ProfileBuilder {
    records: Vec<ProfileRecord>,
    profiled: BTreeSet<i64>,
}

impl ProfileBuilder {
    pub fn add_entry(&mut self, timestamp: u64, tid: i64, address: Handle, function: String) {
        self.profiled.insert(tid);
        self.records.push(ProfileRecord {
            timestamp,
            tid,
            kind: ProfileRecordKind::Entry { address, function },
        });
    }

    pub fn add_exit(&mut self, timestamp: u64, tid: i64, address: Handle) {
        self.profiled.insert(tid);
        self.records.push(ProfileRecord {
            timestamp,
            tid,
            kind: ProfileRecordKind::Exit { address },
        });
    }

    /// Record a context switch; only threads already seen in the profile
    /// are kept
    pub fn add_switch(&mut self, timestamp: u64, prev_tid: i64, next_tid: i64) {
        if self.profiled.contains(&prev_tid) {
            self.records.push(ProfileRecord {
                timestamp,
                tid: prev_tid,
                kind: ProfileRecordKind::SwitchOut,
            });
        }
        if self.profiled.contains(&next_tid) {
            self.records.push(ProfileRecord {
                timestamp,
                tid: next_tid,
                kind: ProfileRecordKind::SwitchIn,
            });
        }
    }

    pub fn is_profiled(&self, tid: i64) -> bool {
        self.profiled.contains(&tid)
    }
}

impl ModelBuilder for ProfileBuilder {
    type Model = ProfileDataModel;

    fn build(self) -> ProfileDataModel {
        ProfileDataModel {
            records: self.records.into(),
        }
    }
}
