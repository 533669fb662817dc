use crate::processor::{HandlerKind, HandlerSet};
use crate::utils::config::SCHEMA_VERSION;
use std::collections::HashMap;

/// Display the events each built-in handler consumes
pub fn display_events() {
    let mut set = HandlerSet::from_kinds(&HandlerKind::ALL, HashMap::new());
    let kinds = set.kinds();

    for (kind, handler) in kinds.iter().zip(set.as_handlers()) {
        println!("{:?} ({})", kind, handler.name());
        println!("  required: {}", join_or_none(handler.required_events()));
        println!("  handled:  {}", join_or_none(handler.interest().names()));
        println!();
    }
    println!("Handlers whose required events all occur in a trace are selected automatically.");
}

fn join_or_none(names: &[&str]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

/// Display version information
pub fn display_version() {
    println!("trace-analysis v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Builds typed data models and derived metrics from ROS 2 and kernel traces.");
}

