//! Build collapsed stacks from reconstructed call trees.
//!
//! Collapsed stacks are the usual interchange format for flamegraph tools.
//! Format: "parent;child;grandchild weight"
//!
//! Example: "main;spin;timer_callback 1000"
//! This means: main called spin which called timer_callback, spending 1000 ns
//! in timer_callback itself.

use super::profile::CallTree;
use log::debug;
use std::collections::HashMap;

/// A single collapsed stack entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string
    pub stack: String,

    /// Weight (self time in nanoseconds)
    pub weight: u64,
}

impl CollapsedStack {
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }

    /// Render as a collapsed-stack line
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }
}

/// Build collapsed stacks from call trees
///
/// **Public** - main entry point for stack building
///
/// # Arguments
/// * `trees` - Call trees, usually one per thread
///
/// # Returns
/// One entry per unique call path, sorted by weight (descending), then by
/// stack for equal weights
///
/// # Algorithm
/// 1. Walk every completed call of every tree
/// 2. Build its root-to-node path string
/// 3. Aggregate self time by unique path
///
/// Open calls have no known duration and are skipped.
pub fn build_collapsed_stacks<'a>(trees: impl IntoIterator<Item = &'a CallTree>) -> Vec<CollapsedStack> {
    // stack string -> total self time
    let mut stack_map: HashMap<String, u64> = HashMap::new();

    for tree in trees {
        for index in 0..tree.nodes.len() {
            if let Some(self_time) = tree.self_time(index) {
                *stack_map.entry(tree.path(index).join(";")).or_insert(0) += self_time;
            }
        }
    }

    let mut stacks: Vec<CollapsedStack> = stack_map
        .into_iter()
        .map(|(stack, weight)| CollapsedStack::new(stack, weight))
        .collect();

    stacks.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));

    debug!("Built {} unique collapsed stacks", stacks.len());

    stacks
}
