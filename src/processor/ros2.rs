//! ROS 2 entity and callback handler.

use super::{building, field, EventHandler, EventInterest};
use crate::data_model::ros2::{DestroyableKind, MessageLayer};
use crate::data_model::{EntityKind, ModelSlot, Ros2Builder, Ros2DataModel};
use crate::parser::{Event, EventMetadata};
use crate::utils::config::ros2::*;
use crate::utils::error::ProcessError;

const HANDLED_EVENTS: &[&str] = &[
    RCL_INIT,
    RCL_NODE_INIT,
    RCL_NODE_FINI,
    RMW_PUBLISHER_INIT,
    RCL_PUBLISHER_INIT,
    RCL_PUBLISHER_FINI,
    RCLCPP_PUBLISH,
    RCL_PUBLISH,
    RMW_PUBLISH,
    RMW_SUBSCRIPTION_INIT,
    RCL_SUBSCRIPTION_INIT,
    RCL_SUBSCRIPTION_FINI,
    RCLCPP_SUBSCRIPTION_INIT,
    RCLCPP_SUBSCRIPTION_CALLBACK_ADDED,
    RMW_TAKE,
    RCL_TAKE,
    RCLCPP_TAKE,
    RCL_SERVICE_INIT,
    RCL_SERVICE_FINI,
    RCLCPP_SERVICE_CALLBACK_ADDED,
    RCL_CLIENT_INIT,
    RCL_CLIENT_FINI,
    RCL_TIMER_INIT,
    RCL_TIMER_FINI,
    RCLCPP_TIMER_CALLBACK_ADDED,
    RCLCPP_TIMER_LINK_NODE,
    RCLCPP_CALLBACK_REGISTER,
    CALLBACK_START,
    CALLBACK_END,
    RCLCPP_EXECUTOR_EXECUTE,
    RCL_LIFECYCLE_STATE_MACHINE_INIT,
    RCL_LIFECYCLE_TRANSITION,
];

const REQUIRED_EVENTS: &[&str] = &[RCL_INIT];

/// Builds the [`Ros2DataModel`] from `ros2:*` tracepoints
#[derive(Debug, Default)]
pub struct Ros2Handler {
    slot: ModelSlot<Ros2Builder>,
}

impl Ros2Handler {
    pub const NAME: &'static str = "ros2";

    pub fn new() -> Self {
        Self::default()
    }

    /// The finalized model, `None` before processing completes
    pub fn data(&self) -> Option<&Ros2DataModel> {
        self.slot.model()
    }

    pub fn into_data(self) -> Option<Ros2DataModel> {
        self.slot.into_model()
    }
}

impl EventHandler for Ros2Handler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interest(&self) -> EventInterest {
        EventInterest::Only(HANDLED_EVENTS)
    }

    fn required_events(&self) -> &'static [&'static str] {
        REQUIRED_EVENTS
    }

    fn handle(&mut self, event: &Event, metadata: &EventMetadata) -> Result<(), ProcessError> {
        let data = building(&mut self.slot, Self::NAME)?;
        let ts = event.timestamp;
        let handle = |name: &str| field(event, event.get_handle(name));
        let text = |name: &str| field(event, event.get_str(name)).map(str::to_string);

        match event.name.as_str() {
            RCL_INIT => {
                let version = text("version")?;
                data.add_context(handle("context_handle")?, ts, metadata.pid, version);
            }
            RCL_NODE_INIT => {
                data.add_node(
                    handle("node_handle")?,
                    ts,
                    metadata.tid,
                    handle("rmw_handle")?,
                    text("node_name")?,
                    text("namespace")?,
                );
            }
            RMW_PUBLISHER_INIT => {
                data.add_rmw_publisher(handle("rmw_publisher_handle")?, ts, event.field("gid").cloned());
            }
            RCL_PUBLISHER_INIT => {
                data.add_publisher(
                    handle("publisher_handle")?,
                    ts,
                    handle("node_handle")?,
                    handle("rmw_publisher_handle")?,
                    text("topic_name")?,
                    field(event, event.get_int("queue_depth"))?,
                );
            }
            RCLCPP_PUBLISH => {
                data.add_publish_instance(MessageLayer::Rclcpp, None, ts, handle("message")?);
            }
            RCL_PUBLISH => {
                let publisher = handle("publisher_handle")?;
                data.add_publish_instance(MessageLayer::Rcl, Some(publisher), ts, handle("message")?);
            }
            RMW_PUBLISH => {
                data.add_publish_instance(MessageLayer::Rmw, None, ts, handle("message")?);
            }
            RMW_SUBSCRIPTION_INIT => {
                data.add_rmw_subscription(
                    handle("rmw_subscription_handle")?,
                    ts,
                    event.field("gid").cloned(),
                );
            }
            RCL_SUBSCRIPTION_INIT => {
                data.add_subscription(
                    handle("subscription_handle")?,
                    ts,
                    handle("node_handle")?,
                    handle("rmw_subscription_handle")?,
                    text("topic_name")?,
                    field(event, event.get_int("queue_depth"))?,
                );
            }
            RCLCPP_SUBSCRIPTION_INIT => {
                data.add_subscription_object(handle("subscription")?, ts, handle("subscription_handle")?);
            }
            RCLCPP_SUBSCRIPTION_CALLBACK_ADDED => {
                add_callback(data, event, "subscription", EntityKind::SubscriptionObject)?;
            }
            RMW_TAKE => {
                data.add_rmw_take_instance(
                    handle("rmw_subscription_handle")?,
                    ts,
                    handle("message")?,
                    field(event, event.get_int("source_timestamp"))?,
                    field(event, event.get_int("taken"))? != 0,
                );
            }
            RCL_TAKE => {
                data.add_take_instance(MessageLayer::Rcl, ts, handle("message")?);
            }
            RCLCPP_TAKE => {
                data.add_take_instance(MessageLayer::Rclcpp, ts, handle("message")?);
            }
            RCL_SERVICE_INIT => {
                data.add_service(
                    handle("service_handle")?,
                    ts,
                    handle("node_handle")?,
                    handle("rmw_service_handle")?,
                    text("service_name")?,
                );
            }
            RCLCPP_SERVICE_CALLBACK_ADDED => {
                add_callback(data, event, "service_handle", EntityKind::Service)?;
            }
            RCL_CLIENT_INIT => {
                data.add_client(
                    handle("client_handle")?,
                    ts,
                    handle("node_handle")?,
                    handle("rmw_client_handle")?,
                    text("service_name")?,
                );
            }
            RCL_TIMER_INIT => {
                let period = field(event, event.get_int("period"))?;
                data.add_timer(handle("timer_handle")?, ts, period, metadata.tid);
            }
            RCLCPP_TIMER_CALLBACK_ADDED => {
                add_callback(data, event, "timer_handle", EntityKind::Timer)?;
            }
            RCLCPP_TIMER_LINK_NODE => {
                data.add_timer_node_link(handle("timer_handle")?, ts, handle("node_handle")?);
            }
            RCLCPP_CALLBACK_REGISTER => {
                data.add_callback_symbol(handle("callback")?, ts, text("symbol")?);
            }
            CALLBACK_START => {
                let intra_process = field(event, event.get_int_or("is_intra_process", 0))? != 0;
                data.start_callback(handle("callback")?, ts, intra_process);
            }
            CALLBACK_END => {
                data.end_callback(handle("callback")?, ts);
            }
            RCLCPP_EXECUTOR_EXECUTE => {
                data.add_executor_execution(handle("handle")?, ts);
            }
            RCL_LIFECYCLE_STATE_MACHINE_INIT => {
                data.add_lifecycle_state_machine(handle("state_machine")?, ts, handle("node_handle")?);
            }
            RCL_LIFECYCLE_TRANSITION => {
                data.add_lifecycle_transition(
                    handle("state_machine")?,
                    text("start_label")?,
                    text("goal_label")?,
                    ts,
                );
            }
            name => {
                if let Some((kind, handle_field)) = destroy_target(name) {
                    data.destroy(kind, handle(handle_field)?, ts);
                }
            }
        }
        Ok(())
    }

    fn finalize(&mut self) {
        self.slot.finalize();
    }

    fn discard(&mut self) {
        self.slot.discard();
    }

    fn is_finalized(&self) -> bool {
        self.slot.is_finalized()
    }
}

/// Register a callback object owned by the entity in `owner_field`
///
/// **Private** - internal helper for the `*_callback_added` events
fn add_callback(
    data: &mut Ros2Builder,
    event: &Event,
    owner_field: &str,
    kind: EntityKind,
) -> Result<(), ProcessError> {
    let owner_handle = field(event, event.get_handle(owner_field))?;
    let callback = field(event, event.get_handle("callback"))?;
    if let Some(owner) = data.owner_reference(kind, owner_handle, event.timestamp) {
        data.add_callback_object(callback, event.timestamp, owner);
    }
    Ok(())
}

/// Entity kind and handle field of a `*_fini` event
fn destroy_target(name: &str) -> Option<(DestroyableKind, &'static str)> {
    Some(match name {
        RCL_NODE_FINI => (DestroyableKind::Node, "node_handle"),
        RCL_PUBLISHER_FINI => (DestroyableKind::Publisher, "publisher_handle"),
        RCL_SUBSCRIPTION_FINI => (DestroyableKind::Subscription, "subscription_handle"),
        RCL_SERVICE_FINI => (DestroyableKind::Service, "service_handle"),
        RCL_CLIENT_FINI => (DestroyableKind::Client, "client_handle"),
        RCL_TIMER_FINI => (DestroyableKind::Timer, "timer_handle"),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::ros2::CallbackOwner;
    use crate::processor::{CoverageMode, Processor};
    use pretty_assertions::assert_eq;

    fn init() -> Event {
        Event::new(RCL_INIT, 1)
            .with_field("context_handle", 0x1_u64)
            .with_field("version", "4.1.0")
            .with_field("vpid", 42)
    }

    #[test]
    fn test_timer_callback_chain() {
        let events = vec![
            init(),
            Event::new(RCL_NODE_INIT, 2)
                .with_field("node_handle", 0x10_u64)
                .with_field("rmw_handle", 0x11_u64)
                .with_field("node_name", "talker")
                .with_field("namespace", "/")
                .with_field("vtid", 7),
            Event::new(RCL_TIMER_INIT, 3)
                .with_field("timer_handle", 0x20_u64)
                .with_field("period", 1_000_000),
            Event::new(RCLCPP_TIMER_CALLBACK_ADDED, 4)
                .with_field("timer_handle", 0x20_u64)
                .with_field("callback", 0x30_u64),
            Event::new(RCLCPP_TIMER_LINK_NODE, 5)
                .with_field("timer_handle", 0x20_u64)
                .with_field("node_handle", 0x10_u64),
            Event::new(CALLBACK_START, 10).with_field("callback", 0x30_u64),
            Event::new(CALLBACK_END, 15).with_field("callback", 0x30_u64),
        ];

        let mut handler = Ros2Handler::new();
        Processor::new(vec![&mut handler], CoverageMode::Strict)
            .unwrap()
            .process(&events)
            .unwrap();

        let data = handler.data().unwrap();
        assert_eq!(data.contexts.latest(0x1).unwrap().pid, Some(42));
        assert_eq!(data.nodes.latest(0x10).unwrap().tid, Some(7));
        let callback = data.callback_objects.latest(0x30).unwrap();
        assert!(matches!(callback.owner, CallbackOwner::Timer(r) if r.is_resolved()));
        assert!(data.timer_node_links.rows()[0].node.is_resolved());
        assert_eq!(data.callback_instances.rows()[0].duration, Some(5));
        assert!(data.anomalies().is_empty());
    }

    #[test]
    fn test_fini_marks_destroyed() {
        let events = vec![
            init(),
            Event::new(RCL_TIMER_INIT, 3)
                .with_field("timer_handle", 0x20_u64)
                .with_field("period", 10),
            Event::new(RCL_TIMER_FINI, 9).with_field("timer_handle", 0x20_u64),
        ];

        let mut handler = Ros2Handler::new();
        Processor::new(vec![&mut handler], CoverageMode::Strict)
            .unwrap()
            .process(&events)
            .unwrap();

        let timer = handler.data().unwrap().timers.latest(0x20).unwrap();
        assert_eq!(timer.destroyed_at, Some(9));
    }

    #[test]
    fn test_message_flow_through_layers() {
        let events = vec![
            init(),
            Event::new(RMW_PUBLISHER_INIT, 2)
                .with_field("rmw_publisher_handle", 0x41_u64)
                .with_field("gid", "01.0f.c3.5a"),
            Event::new(RCL_PUBLISHER_INIT, 3)
                .with_field("publisher_handle", 0x40_u64)
                .with_field("node_handle", 0x10_u64)
                .with_field("rmw_publisher_handle", 0x41_u64)
                .with_field("topic_name", "/chatter")
                .with_field("queue_depth", 10),
            Event::new(RMW_SUBSCRIPTION_INIT, 4).with_field("rmw_subscription_handle", 0x51_u64),
            Event::new(RCLCPP_PUBLISH, 10).with_field("message", 0xaa_u64),
            Event::new(RCL_PUBLISH, 11)
                .with_field("publisher_handle", 0x40_u64)
                .with_field("message", 0xaa_u64),
            Event::new(RMW_PUBLISH, 12).with_field("message", 0xaa_u64),
            Event::new(RMW_TAKE, 20)
                .with_field("rmw_subscription_handle", 0x51_u64)
                .with_field("message", 0xbb_u64)
                .with_field("source_timestamp", 12)
                .with_field("taken", 1),
            Event::new(RCL_TAKE, 21).with_field("message", 0xbb_u64),
            Event::new(RCLCPP_TAKE, 22).with_field("message", 0xbb_u64),
        ];

        let mut handler = Ros2Handler::new();
        Processor::new(vec![&mut handler], CoverageMode::Strict)
            .unwrap()
            .process(&events)
            .unwrap();

        let data = handler.data().unwrap();
        let gid = data.rmw_publishers.latest(0x41).unwrap().gid.clone();
        assert_eq!(gid, Some("01.0f.c3.5a".into()));
        assert_eq!(data.rmw_subscriptions.latest(0x51).unwrap().gid, None);

        let publishes: Vec<(MessageLayer, u64)> = data
            .publish_instances
            .iter()
            .map(|p| (p.layer, p.timestamp))
            .collect();
        assert_eq!(
            publishes,
            vec![(MessageLayer::Rclcpp, 10), (MessageLayer::Rcl, 11), (MessageLayer::Rmw, 12)]
        );
        assert!(data.publish_instances.rows()[1].publisher.unwrap().is_resolved());

        let takes = data.take_instances.rows();
        assert_eq!(takes.len(), 3);
        assert!(takes[0].rmw_subscription.unwrap().is_resolved());
        assert_eq!(takes[0].taken, Some(true));
        assert_eq!(takes[2].layer, MessageLayer::Rclcpp);
    }

    #[test]
    fn test_missing_field_is_invalid_event() {
        let events = vec![init(), Event::new(RCL_NODE_INIT, 2)];

        let mut handler = Ros2Handler::new();
        let result = Processor::new(vec![&mut handler], CoverageMode::Strict)
            .unwrap()
            .process(&events);

        assert!(matches!(
            result,
            Err(ProcessError::InvalidEvent { ref event, .. }) if event == RCL_NODE_INIT
        ));
        assert!(handler.data().is_none());
    }
}
