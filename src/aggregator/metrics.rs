//! Hot paths and time distribution over collapsed stacks.
//!
//! Hot paths are the call paths with the most self time.
//! These are the primary targets for optimization.

use super::stack_builder::CollapsedStack;
use log::debug;
use serde::Serialize;

/// A call path ranked by self time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotPath {
    pub stack: String,
    /// Self time in nanoseconds
    pub time: u64,
    /// Share of the total, 0-100
    pub percentage: f64,
}

/// Calculate hot paths from collapsed stacks
///
/// **Public** - main entry point for metrics calculation
///
/// # Arguments
/// * `stacks` - Collapsed stacks from stack_builder
/// * `total_time` - Time the percentages are relative to
/// * `top_n` - Number of top paths to return (e.g., 10)
///
/// # Returns
/// Vector of hot paths, sorted by time (descending)
pub fn calculate_hot_paths(stacks: &[CollapsedStack], total_time: u64, top_n: usize) -> Vec<HotPath> {
    debug!("Calculating top {} hot paths from {} stacks", top_n, stacks.len());

    // Stacks are already sorted by weight from stack_builder
    stacks
        .iter()
        .take(top_n)
        .map(|stack| create_hot_path(stack, total_time))
        .collect()
}

/// Create a HotPath from a CollapsedStack
///
/// **Private** - internal conversion
fn create_hot_path(stack: &CollapsedStack, total_time: u64) -> HotPath {
    HotPath {
        stack: stack.stack.clone(),
        time: stack.weight,
        percentage: percentage(stack.weight, total_time),
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Self-time distribution statistics
///
/// **Public** - returned from calculate_time_distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeDistribution {
    /// Total self time across all stacks
    pub total_time: u64,

    /// Number of unique stacks
    pub stack_count: usize,

    pub mean_time_per_stack: u64,

    pub median_time_per_stack: u64,

    /// Time spent in the top 10% of stacks
    pub top_10_percent_time: u64,

    /// Percentage of total time in the top 10%
    pub top_10_percent_percentage: f64,
}

/// Calculate self-time distribution statistics
///
/// **Public** - provides summary statistics
///
/// # Arguments
/// * `stacks` - Collapsed stacks, sorted by weight (descending)
pub fn calculate_time_distribution(stacks: &[CollapsedStack]) -> TimeDistribution {
    if stacks.is_empty() {
        return TimeDistribution::default();
    }

    let total: u64 = stacks.iter().map(|s| s.weight).sum();
    let count = stacks.len();

    let mut weights: Vec<u64> = stacks.iter().map(|s| s.weight).collect();
    weights.sort_unstable();
    let median = weights[weights.len() / 2];

    let top_count = (count as f64 * 0.1).ceil() as usize;
    let top_time: u64 = stacks.iter().take(top_count).map(|s| s.weight).sum();

    TimeDistribution {
        total_time: total,
        stack_count: count,
        mean_time_per_stack: total / count as u64,
        median_time_per_stack: median,
        top_10_percent_time: top_time,
        top_10_percent_percentage: percentage(top_time, total),
    }
}

impl TimeDistribution {
    /// True if the top 10% of stacks take more than 80% of the time
    pub fn is_highly_concentrated(&self) -> bool {
        self.top_10_percent_percentage > 80.0
    }

    /// Get human-readable summary
    ///
    /// **Public** - for logging and debugging
    pub fn summary(&self) -> String {
        format!(
            "Total: {} ns | Stacks: {} | Mean: {} | Median: {} | Top 10%: {:.1}%",
            self.total_time,
            self.stack_count,
            self.mean_time_per_stack,
            self.median_time_per_stack,
            self.top_10_percent_percentage
        )
    }
}
