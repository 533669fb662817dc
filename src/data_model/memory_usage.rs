//! Memory accounting samples.
//!
//! Handlers report signed memory changes per thread. Each change becomes a
//! [`MemorySample`] whose `value` is the thread's cumulative allocation
//! counter (bytes ever allocated, never decreasing) and whose `diff` is the
//! signed change in live memory.

use super::{ModelBuilder, Table};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemorySample {
    pub timestamp: u64,
    pub tid: i64,
    /// Cumulative allocation counter for the thread
    pub value: u64,
    /// Signed change in live memory, in bytes
    pub diff: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryUsageDataModel {
    pub samples: Table<MemorySample>,
}

impl MemoryUsageDataModel {
    /// Threads with at least one sample, in first-seen order
    pub fn tids(&self) -> Vec<i64> {
        let mut tids: Vec<i64> = Vec::new();
        for sample in &self.samples {
            if !tids.contains(&sample.tid) {
                tids.push(sample.tid);
            }
        }
        tids
    }
}

#[derive(Debug, Default)]
pub struct MemoryUsageBuilder {
    samples: Vec<MemorySample>,
    counters: HashMap<i64, u64>,
}

impl MemoryUsageBuilder {
    /// Record a signed change in live memory for a thread
    pub fn add_memory_difference(&mut self, timestamp: u64, tid: i64, diff: i64) {
        let counter = self.counters.entry(tid).or_default();
        if diff > 0 {
            *counter = counter.wrapping_add(diff.unsigned_abs());
        }
        let value = *counter;
        self.samples.push(MemorySample {
            timestamp,
            tid,
            value,
            diff,
        });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl ModelBuilder for MemoryUsageBuilder {
    type Model = MemoryUsageDataModel;

    fn build(self) -> MemoryUsageDataModel {
        MemoryUsageDataModel {
            samples: self.samples.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_only_grows() {
        let mut builder = MemoryUsageBuilder::default();
        builder.add_memory_difference(1, 7, 64);
        builder.add_memory_difference(2, 7, -64);
        builder.add_memory_difference(3, 7, 16);
        builder.add_memory_difference(4, 8, 8);

        let model = builder.build();
        let values: Vec<u64> = model.samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![64, 64, 80, 8]);
        assert_eq!(model.tids(), vec![7, 8]);
    }
}
