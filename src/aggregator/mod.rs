//! Read-only queries over finalized data models.
//!
//! This module turns frozen tables into derived metrics:
//! - Callback durations, symbols and owners (ROS 2)
//! - Busy intervals and CPU time per thread
//! - Memory deltas and absolute usage per thread
//! - Call trees, collapsed stacks and hot paths (profiling)
//!
//! Every query borrows the model immutably, so queries may run concurrently.

pub mod cpu_time;
pub mod memory_usage;
pub mod metrics;
pub mod profile;
pub mod ros2;
pub mod stack_builder;

// Re-export main types and functions
pub use cpu_time::{get_busy_intervals, get_time_per_thread, BusyInterval};
pub use memory_usage::{
    get_absolute_memory_usage_by_tid, get_memory_usage, get_peak_memory_usage, MemoryDelta, UsagePoint,
};
pub use metrics::{calculate_hot_paths, calculate_time_distribution, HotPath, TimeDistribution};
pub use profile::{
    get_call_tree, get_call_trees, get_function_duration_data, get_tids, CallNode, CallTree,
    FunctionDurations, FunctionSample,
};
pub use ros2::{
    get_callback_durations, get_callback_objects, get_callback_owner_info, get_callback_symbol,
    get_callback_symbols, get_lifecycle_transitions, get_node_names_from_tid, get_node_tid_from_name, prettify_symbol,
    CallbackDurations, OwnerInfo,
};
pub use stack_builder::{build_collapsed_stacks, CollapsedStack};
