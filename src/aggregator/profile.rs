//! Call-tree reconstruction from function entry/exit records.
//!
//! Each thread's records are replayed through a stack: an entry pushes a
//! node whose parent is the current top, an exit pops the top and closes
//! it. Nodes still open at the end of the stream stay in the tree with no
//! end time.

use crate::data_model::{ProfileDataModel, ProfileRecordKind};
use crate::parser::Handle;
use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One function invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallNode {
    pub function: String,
    pub address: Handle,
    pub depth: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub start: u64,
    pub end: Option<u64>,
    /// Wall time between entry and exit
    pub duration: Option<u64>,
    /// Time the thread was actually on a CPU during the call
    pub actual_duration: Option<u64>,
}

impl CallNode {
    pub fn is_complete(&self) -> bool {
        self.end.is_some()
    }
}

/// Call tree of one thread; nodes are stored in entry order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallTree {
    pub tid: i64,
    pub nodes: Vec<CallNode>,
    pub roots: Vec<usize>,
    /// Exits that arrived with an empty stack
    pub unmatched_exits: usize,
}

impl CallTree {
    pub fn node(&self, index: usize) -> Option<&CallNode> {
        self.nodes.get(index)
    }

    /// Function names from the root down to `index`
    pub fn path(&self, index: usize) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self.nodes.get(index);
        while let Some(node) = current {
            path.push(node.function.as_str());
            current = node.parent.and_then(|p| self.nodes.get(p));
        }
        path.reverse();
        path
    }

    /// Wall time not spent in children; `None` for open calls
    pub fn self_time(&self, index: usize) -> Option<u64> {
        let node = self.nodes.get(index)?;
        let children: u64 = node
            .children
            .iter()
            .filter_map(|c| self.nodes.get(*c).and_then(|n| n.duration))
            .sum();
        node.duration.map(|d| d.saturating_sub(children))
    }

    /// Wall time of all completed root calls
    pub fn total_duration(&self) -> u64 {
        self.roots
            .iter()
            .filter_map(|r| self.nodes[*r].duration)
            .sum()
    }
}

/// On-CPU accounting of an open call
#[derive(Default)]
struct Running {
    since: Option<u64>,
    accumulated: u64,
}

/// Replays one thread's records into a tree
struct TreeBuilder {
    tree: CallTree,
    stack: Vec<(usize, Running)>,
    on_cpu: bool,
}

impl TreeBuilder {
    fn new(tid: i64) -> Self {
        Self {
            tree: CallTree {
                tid,
                ..CallTree::default()
            },
            stack: Vec::new(),
            on_cpu: true,
        }
    }

    fn apply(&mut self, timestamp: u64, kind: &ProfileRecordKind) {
        match kind {
            ProfileRecordKind::Entry { address, function } => {
                let index = self.tree.nodes.len();
                let parent = self.stack.last().map(|(i, _)| *i);
                match parent {
                    Some(p) => self.tree.nodes[p].children.push(index),
                    None => self.tree.roots.push(index),
                }
                self.tree.nodes.push(CallNode {
                    function: function.clone(),
                    address: *address,
                    depth: self.stack.len(),
                    parent,
                    children: Vec::new(),
                    start: timestamp,
                    end: None,
                    duration: None,
                    actual_duration: None,
                });
                let running = Running {
                    since: self.on_cpu.then_some(timestamp),
                    accumulated: 0,
                };
                self.stack.push((index, running));
            }
            ProfileRecordKind::Exit { .. } => match self.stack.pop() {
                Some((index, running)) => {
                    let node = &mut self.tree.nodes[index];
                    let on_cpu = running
                        .since
                        .map_or(0, |since| timestamp.saturating_sub(since));
                    node.end = Some(timestamp);
                    node.duration = Some(timestamp.saturating_sub(node.start));
                    node.actual_duration = Some(running.accumulated + on_cpu);
                }
                None => {
                    debug!(
                        "Function exit at {} on thread {} with no open call",
                        timestamp, self.tree.tid
                    );
                    self.tree.unmatched_exits += 1;
                }
            },
            ProfileRecordKind::SwitchOut => {
                self.on_cpu = false;
                for (_, running) in &mut self.stack {
                    if let Some(since) = running.since.take() {
                        running.accumulated += timestamp.saturating_sub(since);
                    }
                }
            }
            ProfileRecordKind::SwitchIn => {
                self.on_cpu = true;
                // A repeated switch-in keeps the running slice
                for (_, running) in &mut self.stack {
                    if running.since.is_none() {
                        running.since = Some(timestamp);
                    }
                }
            }
        }
    }
}

/// Call trees of every profiled thread
///
/// **Public** - main profiling query
pub fn get_call_trees(model: &ProfileDataModel) -> BTreeMap<i64, CallTree> {
    let mut builders: BTreeMap<i64, TreeBuilder> = BTreeMap::new();
    for record in &model.records {
        builders
            .entry(record.tid)
            .or_insert_with(|| TreeBuilder::new(record.tid))
            .apply(record.timestamp, &record.kind);
    }
    builders
        .into_iter()
        .map(|(tid, builder)| (tid, builder.tree))
        .collect()
}

/// Threads with at least one function record
pub fn get_tids(model: &ProfileDataModel) -> BTreeSet<i64> {
    model
        .records
        .iter()
        .filter(|r| {
            matches!(
                r.kind,
                ProfileRecordKind::Entry { .. } | ProfileRecordKind::Exit { .. }
            )
        })
        .map(|r| r.tid)
        .collect()
}

/// Caller -> callees by function name for one thread
///
/// Root functions appear as keys with an empty (or their own) callee set.
pub fn get_call_tree(model: &ProfileDataModel, tid: i64) -> BTreeMap<String, BTreeSet<String>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let trees = get_call_trees(model);
    let Some(tree) = trees.get(&tid) else {
        return graph;
    };
    for node in &tree.nodes {
        match node.parent.and_then(|p| tree.nodes.get(p)) {
            Some(parent) => {
                graph
                    .entry(parent.function.clone())
                    .or_default()
                    .insert(node.function.clone());
            }
            None => {
                graph.entry(node.function.clone()).or_default();
            }
        }
    }
    graph
}

/// Timing of one completed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSample {
    pub start: u64,
    pub duration: u64,
    pub actual_duration: u64,
    /// Time the thread was scheduled out during the call
    pub duration_difference: u64,
}

/// All completed calls of a function at one depth under one parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDurations {
    pub depth: usize,
    pub function: String,
    pub parent: Option<String>,
    pub samples: Vec<FunctionSample>,
}

/// Duration samples per (depth, function, parent), in first-seen order
pub fn get_function_duration_data(model: &ProfileDataModel, tid: i64) -> Vec<FunctionDurations> {
    let trees = get_call_trees(model);
    let Some(tree) = trees.get(&tid) else {
        return Vec::new();
    };

    let mut groups: Vec<FunctionDurations> = Vec::new();
    for node in &tree.nodes {
        let (Some(duration), Some(actual)) = (node.duration, node.actual_duration) else {
            continue;
        };
        let parent = node
            .parent
            .and_then(|p| tree.nodes.get(p))
            .map(|p| p.function.clone());
        let sample = FunctionSample {
            start: node.start,
            duration,
            actual_duration: actual,
            duration_difference: duration.saturating_sub(actual),
        };
        match groups
            .iter_mut()
            .find(|g| g.depth == node.depth && g.function == node.function && g.parent == parent)
        {
            Some(group) => group.samples.push(sample),
            None => groups.push(FunctionDurations {
                depth: node.depth,
                function: node.function.clone(),
                parent,
                samples: vec![sample],
            }),
        }
    }
    groups
}
