use pretty_assertions::assert_eq;
use std::collections::HashMap;
use trace_analysis::aggregator::{
    get_call_trees, get_callback_durations, get_callback_objects, get_memory_usage,
    get_time_per_thread, MemoryDelta,
};
use trace_analysis::data_model::ros2::CallbackOwner;
use trace_analysis::data_model::{Anomaly, EntityKey, EntityKind};
use trace_analysis::parser::Event;
use trace_analysis::processor::{
    CoverageMode, CpuTimeHandler, EventHandler, ProfileHandler, Processor, Ros2Handler,
    UserspaceMemoryUsageHandler,
};
use trace_analysis::utils::config::{cyg_profile, ros2, ust_libc, SCHED_SWITCH};
use trace_analysis::utils::ProcessError;

fn rcl_init(ts: u64) -> Event {
    Event::new(ros2::RCL_INIT, ts)
        .with_field("context_handle", 0x1_u64)
        .with_field("version", "4.1.0")
}

fn node_init(ts: u64, handle: u64, name: &str) -> Event {
    Event::new(ros2::RCL_NODE_INIT, ts)
        .with_field("node_handle", handle)
        .with_field("rmw_handle", 0x99_u64)
        .with_field("node_name", name)
        .with_field("namespace", "/")
        .with_field("vtid", 100)
}

fn switch(ts: u64, prev: i32, next: i32) -> Event {
    Event::new(SCHED_SWITCH, ts)
        .with_field("cpu_id", 0)
        .with_field("prev_tid", prev)
        .with_field("next_tid", next)
}

fn ros2_stream() -> Vec<Event> {
    vec![
        rcl_init(1),
        node_init(2, 0x10, "talker"),
        Event::new(ros2::RCL_SUBSCRIPTION_INIT, 3)
            .with_field("subscription_handle", 0x20_u64)
            .with_field("node_handle", 0x10_u64)
            .with_field("rmw_subscription_handle", 0x21_u64)
            .with_field("topic_name", "/chatter")
            .with_field("queue_depth", 10),
        Event::new(ros2::RCLCPP_SUBSCRIPTION_INIT, 4)
            .with_field("subscription", 0x30_u64)
            .with_field("subscription_handle", 0x20_u64),
        Event::new(ros2::RCLCPP_SUBSCRIPTION_CALLBACK_ADDED, 5)
            .with_field("subscription", 0x30_u64)
            .with_field("callback", 0xA_u64),
        Event::new(ros2::CALLBACK_START, 10).with_field("callback", 0xA_u64),
        Event::new(ros2::CALLBACK_END, 15).with_field("callback", 0xA_u64),
        Event::new(ros2::CALLBACK_START, 20).with_field("callback", 0xA_u64),
    ]
}

#[test]
fn test_no_handlers_is_configuration_error() {
    let result = Processor::new(Vec::new(), CoverageMode::Strict);
    assert!(matches!(result, Err(ProcessError::Configuration(_))));
}

#[test]
fn test_full_coverage_finalizes_every_handler() {
    let mut events = ros2_stream();
    events.push(switch(30, 0, 7));

    let mut ros2_handler = Ros2Handler::new();
    let mut cpu = CpuTimeHandler::new();
    let summary = Processor::new(vec![&mut ros2_handler, &mut cpu], CoverageMode::Strict)
        .unwrap()
        .process(&events)
        .unwrap();

    assert!(ros2_handler.is_finalized());
    assert!(cpu.is_finalized());
    assert_eq!(summary.events_total, events.len());
    assert_eq!(summary.handlers, vec!["ros2", "cpu_time"]);
    assert!(summary.missing_events.is_empty());
}

#[test]
fn test_missing_required_event_in_strict_mode() {
    let events = vec![switch(0, 0, 1)];

    let mut ros2_handler = Ros2Handler::new();
    let mut cpu = CpuTimeHandler::new();
    let result = Processor::new(vec![&mut ros2_handler, &mut cpu], CoverageMode::Strict)
        .unwrap()
        .process(&events);

    match result {
        Err(ProcessError::RequiredEventNotFound { event, handlers }) => {
            assert_eq!(event, ros2::RCL_INIT);
            assert_eq!(handlers, vec!["ros2"]);
        }
        other => panic!("expected RequiredEventNotFound, got {:?}", other),
    }
    assert!(!cpu.is_finalized());
}

#[test]
fn test_missing_required_event_in_partial_mode() {
    let events = vec![switch(0, 0, 1), switch(4, 1, 0)];

    let mut ros2_handler = Ros2Handler::new();
    let mut cpu = CpuTimeHandler::new();
    let summary = Processor::new(vec![&mut ros2_handler, &mut cpu], CoverageMode::Partial)
        .unwrap()
        .process(&events)
        .unwrap();

    assert_eq!(summary.missing_events.len(), 1);
    assert_eq!(summary.missing_events[0].event, ros2::RCL_INIT);
    assert!(ros2_handler.data().unwrap().nodes.is_empty());
    assert_eq!(get_time_per_thread(cpu.data().unwrap())[&1], 4);
}

#[test]
fn test_processing_is_deterministic() {
    let events = ros2_stream();

    let run = || {
        let mut handler = Ros2Handler::new();
        Processor::new(vec![&mut handler], CoverageMode::Strict)
            .unwrap()
            .process(&events)
            .unwrap();
        handler.into_data().unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_handle_reuse_keeps_both_versions() {
    let events = vec![
        rcl_init(1),
        node_init(2, 0x10, "first"),
        // Same (handle, timestamp): rejected
        node_init(2, 0x10, "duplicate"),
        Event::new(ros2::RCL_NODE_FINI, 5).with_field("node_handle", 0x10_u64),
        node_init(6, 0x10, "second"),
        Event::new(ros2::RCL_PUBLISHER_INIT, 7)
            .with_field("publisher_handle", 0x40_u64)
            .with_field("node_handle", 0x10_u64)
            .with_field("rmw_publisher_handle", 0x41_u64)
            .with_field("topic_name", "/out")
            .with_field("queue_depth", 1),
    ];

    let mut handler = Ros2Handler::new();
    Processor::new(vec![&mut handler], CoverageMode::Strict)
        .unwrap()
        .process(&events)
        .unwrap();
    let data = handler.data().unwrap();

    let names: Vec<&str> = data.nodes.versions(0x10).map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
    assert_eq!(data.duplicate_rows, 1);
    assert_eq!(data.nodes.resolve(0x10, 5).unwrap().destroyed_at, Some(5));
    assert_eq!(data.nodes.resolve(0x10, 6).unwrap().name, "second");

    // The publisher created at 7 points at the second node
    let publisher = data.publishers.latest(0x40).unwrap();
    assert_eq!(publisher.node.resolved.unwrap().created_at, 6);
}

#[test]
fn test_callback_pairing_excludes_open_instance() {
    let mut handler = Ros2Handler::new();
    Processor::new(vec![&mut handler], CoverageMode::Strict)
        .unwrap()
        .process(&ros2_stream())
        .unwrap();
    let data = handler.data().unwrap();

    let durations = get_callback_durations(data, EntityKey::new(0xA, 5));
    assert_eq!(durations.durations, vec![(10, 5)]);
    assert_eq!(data.callback_instances.len(), 2);
    assert!(!data.callback_instances.rows()[1].is_complete());
    assert!(matches!(
        data.callback_objects.latest(0xA).unwrap().owner,
        CallbackOwner::Subscription(r) if r.is_resolved()
    ));
}

#[test]
fn test_reused_callback_handle_splits_durations() {
    let timer = |ts: u64, handle: u64| {
        Event::new(ros2::RCL_TIMER_INIT, ts)
            .with_field("timer_handle", handle)
            .with_field("period", 1_000_000)
    };
    let callback_added = |ts: u64, timer: u64| {
        Event::new(ros2::RCLCPP_TIMER_CALLBACK_ADDED, ts)
            .with_field("timer_handle", timer)
            .with_field("callback", 0x30_u64)
    };
    let callback = |name: &str, ts: u64| Event::new(name, ts).with_field("callback", 0x30_u64);
    let events = vec![
        rcl_init(0),
        timer(0, 0x20),
        callback_added(1, 0x20),
        callback(ros2::CALLBACK_START, 10),
        callback(ros2::CALLBACK_END, 15),
        timer(90, 0x21),
        callback_added(100, 0x21),
        callback(ros2::CALLBACK_START, 110),
        callback(ros2::CALLBACK_END, 130),
        // Never registered
        Event::new(ros2::CALLBACK_START, 140).with_field("callback", 0x99_u64),
    ];

    let mut handler = Ros2Handler::new();
    Processor::new(vec![&mut handler], CoverageMode::Strict)
        .unwrap()
        .process(&events)
        .unwrap();
    let data = handler.data().unwrap();

    let first = EntityKey::new(0x30, 1);
    let second = EntityKey::new(0x30, 100);
    assert_eq!(get_callback_objects(data), vec![first, second]);
    assert_eq!(get_callback_durations(data, first).durations, vec![(10, 5)]);
    assert_eq!(get_callback_durations(data, second).durations, vec![(110, 20)]);
    assert_eq!(
        data.anomalies(),
        vec![Anomaly::UnresolvedReference {
            kind: EntityKind::Callback,
            handle: 0x99,
            at: 140,
        }]
    );
}

#[test]
fn test_cpu_time_per_thread() {
    let events = vec![switch(0, 0, 1), switch(5, 1, 2), switch(12, 2, 1)];

    let mut cpu = CpuTimeHandler::new();
    Processor::new(vec![&mut cpu], CoverageMode::Strict)
        .unwrap()
        .process(&events)
        .unwrap();

    let totals = get_time_per_thread(cpu.data().unwrap());
    assert_eq!(totals.get(&1), Some(&5));
    assert_eq!(totals.get(&2), Some(&7));
}

#[test]
fn test_userspace_memory_through_processor() {
    let events = vec![
        Event::new(ust_libc::MALLOC, 1)
            .with_field("vtid", 3)
            .with_field("ptr", 0x1000_u64)
            .with_field("size", 64),
        Event::new(ust_libc::FREE, 2)
            .with_field("vtid", 3)
            .with_field("ptr", 0x1000_u64),
        Event::new(ust_libc::MALLOC, 3)
            .with_field("vtid", 3)
            .with_field("ptr", 0x2000_u64)
            .with_field("size", 32),
    ];

    let mut memory = UserspaceMemoryUsageHandler::new();
    Processor::new(vec![&mut memory], CoverageMode::Strict)
        .unwrap()
        .process(&events)
        .unwrap();
    let model = memory.data().unwrap();

    let diffs: Vec<i64> = model.samples.iter().map(|s| s.diff).collect();
    assert_eq!(diffs, vec![64, -64, 32]);

    // Deltas of the allocation counter: a free allocates nothing
    assert_eq!(
        get_memory_usage(model)[&3],
        vec![
            MemoryDelta::Change { timestamp: 2, bytes: 0 },
            MemoryDelta::Change { timestamp: 3, bytes: 32 },
        ]
    );
}

#[test]
fn test_call_tree_reconstruction() {
    let entry = |ts: u64, addr: u64| {
        Event::new(cyg_profile::FUNC_ENTRY, ts)
            .with_field("vtid", 1)
            .with_field("addr", addr)
    };
    let exit = |ts: u64, addr: u64| {
        Event::new(cyg_profile::FUNC_EXIT, ts)
            .with_field("vtid", 1)
            .with_field("addr", addr)
    };
    let events = vec![
        entry(0, 0xa),
        entry(2, 0xb),
        exit(8, 0xb),
        exit(10, 0xa),
        switch(20, 5, 6),
    ];
    let symbols = HashMap::from([(0xa, "A".to_string()), (0xb, "B".to_string())]);

    let mut profile = ProfileHandler::new(symbols);
    Processor::new(vec![&mut profile], CoverageMode::Strict)
        .unwrap()
        .process(&events)
        .unwrap();

    let trees = get_call_trees(profile.data().unwrap());
    let tree = &trees[&1];
    let root = &tree.nodes[tree.roots[0]];
    assert_eq!((root.function.as_str(), root.start, root.end), ("A", 0, Some(10)));
    let child = &tree.nodes[root.children[0]];
    assert_eq!((child.function.as_str(), child.start, child.end), ("B", 2, Some(8)));
}

#[test]
fn test_error_discards_every_model() {
    let events = vec![
        switch(0, 0, 1),
        // Missing next_tid
        Event::new(SCHED_SWITCH, 5).with_field("cpu_id", 0).with_field("prev_tid", 1),
    ];

    let mut cpu = CpuTimeHandler::new();
    let result = Processor::new(vec![&mut cpu], CoverageMode::Strict)
        .unwrap()
        .process(&events);

    assert!(matches!(result, Err(ProcessError::InvalidEvent { .. })));
    assert!(cpu.data().is_none());
    assert!(!cpu.is_finalized());
}
