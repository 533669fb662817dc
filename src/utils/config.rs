//! Configuration and constants for the analysis pipeline.

use super::error::ConfigError;
use crate::parser::Handle;
use crate::processor::CoverageMode;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Current report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Kernel page size used to turn page orders into bytes
pub const PAGE_SIZE: i64 = 4096;

/// Events between two progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100_000;

// Context fields attached to events by the tracer
pub const CPU_ID_FIELD: &str = "cpu_id";
pub const PROCNAME_FIELD: &str = "procname";
pub const PID_FIELD_NAMES: &[&str] = &["vpid", "pid"];
pub const TID_FIELD_NAMES: &[&str] = &["vtid", "tid"];

/// Kernel scheduler tracepoint
pub const SCHED_SWITCH: &str = "sched_switch";

/// ROS 2 tracepoint names
pub mod ros2 {
    pub const RCL_INIT: &str = "ros2:rcl_init";
    pub const RCL_NODE_INIT: &str = "ros2:rcl_node_init";
    pub const RCL_NODE_FINI: &str = "ros2:rcl_node_fini";
    pub const RMW_PUBLISHER_INIT: &str = "ros2:rmw_publisher_init";
    pub const RCL_PUBLISHER_INIT: &str = "ros2:rcl_publisher_init";
    pub const RCL_PUBLISHER_FINI: &str = "ros2:rcl_publisher_fini";
    pub const RCLCPP_PUBLISH: &str = "ros2:rclcpp_publish";
    pub const RCL_PUBLISH: &str = "ros2:rcl_publish";
    pub const RMW_PUBLISH: &str = "ros2:rmw_publish";
    pub const RMW_SUBSCRIPTION_INIT: &str = "ros2:rmw_subscription_init";
    pub const RCL_SUBSCRIPTION_INIT: &str = "ros2:rcl_subscription_init";
    pub const RCL_SUBSCRIPTION_FINI: &str = "ros2:rcl_subscription_fini";
    pub const RCLCPP_SUBSCRIPTION_INIT: &str = "ros2:rclcpp_subscription_init";
    pub const RCLCPP_SUBSCRIPTION_CALLBACK_ADDED: &str =
        "ros2:rclcpp_subscription_callback_added";
    pub const RMW_TAKE: &str = "ros2:rmw_take";
    pub const RCL_TAKE: &str = "ros2:rcl_take";
    pub const RCLCPP_TAKE: &str = "ros2:rclcpp_take";
    pub const RCL_SERVICE_INIT: &str = "ros2:rcl_service_init";
    pub const RCL_SERVICE_FINI: &str = "ros2:rcl_service_fini";
    pub const RCLCPP_SERVICE_CALLBACK_ADDED: &str = "ros2:rclcpp_service_callback_added";
    pub const RCL_CLIENT_INIT: &str = "ros2:rcl_client_init";
    pub const RCL_CLIENT_FINI: &str = "ros2:rcl_client_fini";
    pub const RCL_TIMER_INIT: &str = "ros2:rcl_timer_init";
    pub const RCL_TIMER_FINI: &str = "ros2:rcl_timer_fini";
    pub const RCLCPP_TIMER_CALLBACK_ADDED: &str = "ros2:rclcpp_timer_callback_added";
    pub const RCLCPP_TIMER_LINK_NODE: &str = "ros2:rclcpp_timer_link_node";
    pub const RCLCPP_CALLBACK_REGISTER: &str = "ros2:rclcpp_callback_register";
    pub const CALLBACK_START: &str = "ros2:callback_start";
    pub const CALLBACK_END: &str = "ros2:callback_end";
    pub const RCLCPP_EXECUTOR_EXECUTE: &str = "ros2:rclcpp_executor_execute";
    pub const RCL_LIFECYCLE_STATE_MACHINE_INIT: &str = "ros2:rcl_lifecycle_state_machine_init";
    pub const RCL_LIFECYCLE_TRANSITION: &str = "ros2:rcl_lifecycle_transition";
}

/// Userspace libc wrapper tracepoint names
pub mod ust_libc {
    pub const MALLOC: &str = "lttng_ust_libc:malloc";
    pub const CALLOC: &str = "lttng_ust_libc:calloc";
    pub const REALLOC: &str = "lttng_ust_libc:realloc";
    pub const FREE: &str = "lttng_ust_libc:free";
    pub const MEMALIGN: &str = "lttng_ust_libc:memalign";
    pub const POSIX_MEMALIGN: &str = "lttng_ust_libc:posix_memalign";
}

/// Kernel memory tracepoint names
pub mod kmem {
    pub const PAGE_ALLOC: &str = "kmem_mm_page_alloc";
    pub const PAGE_FREE: &str = "kmem_mm_page_free";
}

/// Function instrumentation tracepoint names
pub mod cyg_profile {
    pub const FUNC_ENTRY: &str = "lttng_ust_cyg_profile_fast:func_entry";
    pub const FUNC_EXIT: &str = "lttng_ust_cyg_profile_fast:func_exit";
}

/// Analysis configuration, usually loaded from a TOML file
///
/// Every field is optional so that a file only needs to mention what it
/// changes; command line flags take precedence over file values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisConfig {
    /// Coverage policy for missing required events
    #[serde(default)]
    pub mode: Option<CoverageMode>,

    /// Events between two progress log lines
    #[serde(default)]
    pub progress_interval: Option<usize>,

    /// Function address (hex or decimal string) -> function name
    #[serde(default)]
    pub symbols: HashMap<String, String>,
}

impl AnalysisConfig {
    /// Resolve the symbol table into numeric addresses
    ///
    /// **Public** - used to build the profile handler
    pub fn symbol_map(&self) -> Result<HashMap<Handle, String>, ConfigError> {
        self.symbols
            .iter()
            .map(|(addr, name)| {
                parse_address(addr)
                    .map(|a| (a, name.clone()))
                    .ok_or_else(|| ConfigError::InvalidAddress(addr.clone()))
            })
            .collect()
    }

    /// Progress interval, falling back to the default
    pub fn progress_interval(&self) -> usize {
        self.progress_interval
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PROGRESS_INTERVAL)
    }
}

/// Load the analysis configuration from a TOML file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Toml` - If TOML is invalid
pub fn load_config(path: impl AsRef<Path>) -> Result<AnalysisConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: AnalysisConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Parse an address written as `0x`-prefixed hex or plain decimal
pub fn parse_address(value: &str) -> Option<Handle> {
    let value = value.trim();
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        value.parse::<u64>().ok()
    }
}
