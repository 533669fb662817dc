//! ROS 2 entity data model.
//!
//! Objects (nodes, publishers, timers, ...) are one-time creation events and
//! live in [`EntityTable`]s keyed by `(handle, timestamp)`. Instances
//! (callback executions, publishes, takes, lifecycle transitions) are plain
//! [`Table`]s in arrival order.

use super::{
    Anomaly, Entity, EntityBuffer, EntityKey, EntityKind, EntityRef, EntityTable, ModelBuilder,
    PairingAnomaly, Table,
};
use crate::parser::{FieldValue, Handle};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

macro_rules! entity_row {
    ($row:ty) => {
        impl Entity for $row {
            fn key(&self) -> EntityKey {
                EntityKey::new(self.handle, self.timestamp)
            }
        }
    };
    ($row:ty, destroyable) => {
        impl Entity for $row {
            fn key(&self) -> EntityKey {
                EntityKey::new(self.handle, self.timestamp)
            }

            fn mark_destroyed(&mut self, at: u64) {
                self.destroyed_at = Some(at);
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Context {
    pub handle: Handle,
    pub timestamp: u64,
    pub pid: Option<i64>,
    pub version: String,
}
entity_row!(Context);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub handle: Handle,
    pub timestamp: u64,
    pub tid: Option<i64>,
    pub rmw_handle: Handle,
    pub name: String,
    pub namespace: String,
    pub destroyed_at: Option<u64>,
}
entity_row!(Node, destroyable);

/// Row shared by publishers and subscriptions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicEndpoint {
    pub handle: Handle,
    pub timestamp: u64,
    pub node: EntityRef,
    pub rmw_handle: Handle,
    pub topic_name: String,
    pub depth: i64,
    pub destroyed_at: Option<u64>,
}
entity_row!(TopicEndpoint, destroyable);

/// rmw-layer publisher or subscription, identified by its DDS GID
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RmwEndpoint {
    pub handle: Handle,
    pub timestamp: u64,
    pub gid: Option<FieldValue>,
}
entity_row!(RmwEndpoint);

/// Link from the rclcpp subscription object to the rcl subscription
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionObject {
    pub handle: Handle,
    pub timestamp: u64,
    pub subscription: EntityRef,
}
entity_row!(SubscriptionObject);

/// Row shared by services and clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceEndpoint {
    pub handle: Handle,
    pub timestamp: u64,
    pub node: EntityRef,
    pub rmw_handle: Handle,
    pub service_name: String,
    pub destroyed_at: Option<u64>,
}
entity_row!(ServiceEndpoint, destroyable);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timer {
    pub handle: Handle,
    pub timestamp: u64,
    /// Period in nanoseconds
    pub period: i64,
    pub tid: Option<i64>,
    pub destroyed_at: Option<u64>,
}
entity_row!(Timer, destroyable);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerNodeLink {
    pub timer: EntityRef,
    pub timestamp: u64,
    pub node: EntityRef,
}

/// Owning entity of a callback, as a tagged reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reference")]
pub enum CallbackOwner {
    Timer(EntityRef),
    /// Points at a [`SubscriptionObject`] (the rclcpp subscription)
    Subscription(EntityRef),
    Service(EntityRef),
    Client(EntityRef),
}

impl CallbackOwner {
    pub fn reference(&self) -> &EntityRef {
        match self {
            Self::Timer(r) | Self::Subscription(r) | Self::Service(r) | Self::Client(r) => r,
        }
    }

    pub fn entity_kind(&self) -> EntityKind {
        match self {
            Self::Timer(_) => EntityKind::Timer,
            Self::Subscription(_) => EntityKind::SubscriptionObject,
            Self::Service(_) => EntityKind::Service,
            Self::Client(_) => EntityKind::Client,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Timer(_) => "Timer",
            Self::Subscription(_) => "Subscription",
            Self::Service(_) => "Service",
            Self::Client(_) => "Client",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackObject {
    pub handle: Handle,
    pub timestamp: u64,
    pub owner: CallbackOwner,
}
entity_row!(CallbackObject);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackSymbol {
    pub handle: Handle,
    pub timestamp: u64,
    pub symbol: String,
}
entity_row!(CallbackSymbol);

/// One callback execution
///
/// `duration` stays `None` until the matching end event; an instance that
/// never ends is kept as-is. An end with no open instance gets a row with
/// no start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackInstance {
    /// The callback object version alive at the start (or end) event
    pub callback: EntityRef,
    pub start_timestamp: Option<u64>,
    pub end_timestamp: Option<u64>,
    pub duration: Option<u64>,
    pub intra_process: bool,
    pub anomaly: Option<PairingAnomaly>,
}

impl CallbackInstance {
    pub fn callback_object(&self) -> Handle {
        self.callback.handle
    }

    pub fn is_complete(&self) -> bool {
        self.duration.is_some()
    }
}

/// Client library layer a message passed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageLayer {
    Rclcpp,
    Rcl,
    Rmw,
}

/// One message handed to a publish call at some layer
///
/// Only the rcl layer reports the publisher; rclcpp and rmw publishes are
/// matched to it through `message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishInstance {
    pub layer: MessageLayer,
    pub publisher: Option<EntityRef>,
    pub timestamp: u64,
    pub message: Handle,
}

/// One message taken from a subscription at some layer
///
/// Only the rmw layer reports the (rmw) subscription, the source timestamp
/// and whether a message was actually taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TakeInstance {
    pub layer: MessageLayer,
    pub rmw_subscription: Option<EntityRef>,
    pub timestamp: u64,
    pub message: Handle,
    pub source_timestamp: Option<i64>,
    pub taken: Option<bool>,
}

/// One executor dispatch of an executable entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutorExecution {
    pub timestamp: u64,
    pub handle: Handle,
    /// Kind of the executable, `None` if the handle matched nothing alive
    pub kind: Option<EntityKind>,
    pub resolved: Option<EntityKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleStateMachine {
    pub handle: Handle,
    pub timestamp: u64,
    pub node: EntityRef,
}
entity_row!(LifecycleStateMachine);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifecycleTransition {
    pub state_machine: EntityRef,
    pub start_label: String,
    pub goal_label: String,
    pub timestamp: u64,
}

/// Finalized ROS 2 data model
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ros2DataModel {
    pub contexts: EntityTable<Context>,
    pub nodes: EntityTable<Node>,
    pub publishers: EntityTable<TopicEndpoint>,
    pub rmw_publishers: EntityTable<RmwEndpoint>,
    pub subscriptions: EntityTable<TopicEndpoint>,
    pub rmw_subscriptions: EntityTable<RmwEndpoint>,
    pub subscription_objects: EntityTable<SubscriptionObject>,
    pub services: EntityTable<ServiceEndpoint>,
    pub clients: EntityTable<ServiceEndpoint>,
    pub timers: EntityTable<Timer>,
    pub timer_node_links: Table<TimerNodeLink>,
    pub callback_objects: EntityTable<CallbackObject>,
    pub callback_symbols: EntityTable<CallbackSymbol>,
    pub callback_instances: Table<CallbackInstance>,
    pub publish_instances: Table<PublishInstance>,
    pub take_instances: Table<TakeInstance>,
    pub executor_executions: Table<ExecutorExecution>,
    pub lifecycle_state_machines: EntityTable<LifecycleStateMachine>,
    pub lifecycle_transitions: Table<LifecycleTransition>,
    /// Rows dropped because their `(handle, timestamp)` already existed
    pub duplicate_rows: usize,
}

impl Ros2DataModel {
    /// Every data-quality anomaly recorded on a row, in table order
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut out = Vec::new();
        let node_refs = self
            .publishers
            .iter()
            .chain(self.subscriptions.iter())
            .map(|p| p.node)
            .chain(self.services.iter().chain(self.clients.iter()).map(|s| s.node))
            .chain(self.timer_node_links.iter().map(|l| l.node))
            .chain(self.lifecycle_state_machines.iter().map(|m| m.node));
        out.extend(node_refs.filter_map(|r| r.anomaly(EntityKind::Node)));
        out.extend(
            self.subscription_objects
                .iter()
                .filter_map(|s| s.subscription.anomaly(EntityKind::Subscription)),
        );
        out.extend(
            self.timer_node_links
                .iter()
                .filter_map(|l| l.timer.anomaly(EntityKind::Timer)),
        );
        out.extend(
            self.callback_objects
                .iter()
                .filter_map(|c| c.owner.reference().anomaly(c.owner.entity_kind())),
        );
        out.extend(
            self.publish_instances
                .iter()
                .filter_map(|p| p.publisher?.anomaly(EntityKind::Publisher)),
        );
        out.extend(
            self.take_instances
                .iter()
                .filter_map(|t| t.rmw_subscription?.anomaly(EntityKind::RmwSubscription)),
        );
        out.extend(
            self.executor_executions
                .iter()
                .filter(|e| e.resolved.is_none())
                .map(|e| Anomaly::UnresolvedReference {
                    kind: EntityKind::Executable,
                    handle: e.handle,
                    at: e.timestamp,
                }),
        );
        out.extend(
            self.lifecycle_transitions
                .iter()
                .filter_map(|t| t.state_machine.anomaly(EntityKind::StateMachine)),
        );
        for instance in &self.callback_instances {
            out.extend(instance.callback.anomaly(EntityKind::Callback));
            out.extend(instance.anomaly.map(|kind| Anomaly::Pairing {
                kind,
                handle: instance.callback_object(),
                at: instance.callback.at,
            }));
        }
        out
    }
}

/// Row buffers for the ROS 2 model during processing
#[derive(Debug, Default)]
pub struct Ros2Builder {
    contexts: EntityBuffer<Context>,
    nodes: EntityBuffer<Node>,
    publishers: EntityBuffer<TopicEndpoint>,
    rmw_publishers: EntityBuffer<RmwEndpoint>,
    subscriptions: EntityBuffer<TopicEndpoint>,
    rmw_subscriptions: EntityBuffer<RmwEndpoint>,
    subscription_objects: EntityBuffer<SubscriptionObject>,
    services: EntityBuffer<ServiceEndpoint>,
    clients: EntityBuffer<ServiceEndpoint>,
    timers: EntityBuffer<Timer>,
    timer_node_links: Vec<TimerNodeLink>,
    callback_objects: EntityBuffer<CallbackObject>,
    callback_symbols: EntityBuffer<CallbackSymbol>,
    callback_instances: Vec<CallbackInstance>,
    publish_instances: Vec<PublishInstance>,
    take_instances: Vec<TakeInstance>,
    executor_executions: Vec<ExecutorExecution>,
    lifecycle_state_machines: EntityBuffer<LifecycleStateMachine>,
    lifecycle_transitions: Vec<LifecycleTransition>,
    // callback object -> index of its open instance
    open_callbacks: HashMap<Handle, usize>,
}

/// Kinds of ROS 2 objects with a destroy event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyableKind {
    Node,
    Publisher,
    Subscription,
    Service,
    Client,
    Timer,
}

impl Ros2Builder {
    pub fn add_context(&mut self, handle: Handle, timestamp: u64, pid: Option<i64>, version: String) {
        self.contexts.insert(Context {
            handle,
            timestamp,
            pid,
            version,
        });
    }

    pub fn add_node(
        &mut self,
        handle: Handle,
        timestamp: u64,
        tid: Option<i64>,
        rmw_handle: Handle,
        name: String,
        namespace: String,
    ) {
        self.nodes.insert(Node {
            handle,
            timestamp,
            tid,
            rmw_handle,
            name,
            namespace,
            destroyed_at: None,
        });
    }

    fn topic_endpoint(
        &self,
        handle: Handle,
        timestamp: u64,
        node_handle: Handle,
        rmw_handle: Handle,
        topic_name: String,
        depth: i64,
    ) -> TopicEndpoint {
        TopicEndpoint {
            handle,
            timestamp,
            node: self.nodes.reference(node_handle, timestamp),
            rmw_handle,
            topic_name,
            depth,
            destroyed_at: None,
        }
    }

    pub fn add_publisher(
        &mut self,
        handle: Handle,
        timestamp: u64,
        node_handle: Handle,
        rmw_handle: Handle,
        topic_name: String,
        depth: i64,
    ) {
        let row = self.topic_endpoint(handle, timestamp, node_handle, rmw_handle, topic_name, depth);
        self.publishers.insert(row);
    }

    pub fn add_subscription(
        &mut self,
        handle: Handle,
        timestamp: u64,
        node_handle: Handle,
        rmw_handle: Handle,
        topic_name: String,
        depth: i64,
    ) {
        let row = self.topic_endpoint(handle, timestamp, node_handle, rmw_handle, topic_name, depth);
        self.subscriptions.insert(row);
    }

    pub fn add_rmw_publisher(&mut self, handle: Handle, timestamp: u64, gid: Option<FieldValue>) {
        self.rmw_publishers.insert(RmwEndpoint {
            handle,
            timestamp,
            gid,
        });
    }

    pub fn add_rmw_subscription(&mut self, handle: Handle, timestamp: u64, gid: Option<FieldValue>) {
        self.rmw_subscriptions.insert(RmwEndpoint {
            handle,
            timestamp,
            gid,
        });
    }

    pub fn add_subscription_object(&mut self, handle: Handle, timestamp: u64, subscription_handle: Handle) {
        let subscription = self.subscriptions.reference(subscription_handle, timestamp);
        self.subscription_objects.insert(SubscriptionObject {
            handle,
            timestamp,
            subscription,
        });
    }

    fn service_endpoint(
        &self,
        handle: Handle,
        timestamp: u64,
        node_handle: Handle,
        rmw_handle: Handle,
        service_name: String,
    ) -> ServiceEndpoint {
        ServiceEndpoint {
            handle,
            timestamp,
            node: self.nodes.reference(node_handle, timestamp),
            rmw_handle,
            service_name,
            destroyed_at: None,
        }
    }

    pub fn add_service(
        &mut self,
        handle: Handle,
        timestamp: u64,
        node_handle: Handle,
        rmw_handle: Handle,
        service_name: String,
    ) {
        let row = self.service_endpoint(handle, timestamp, node_handle, rmw_handle, service_name);
        self.services.insert(row);
    }

    pub fn add_client(
        &mut self,
        handle: Handle,
        timestamp: u64,
        node_handle: Handle,
        rmw_handle: Handle,
        service_name: String,
    ) {
        let row = self.service_endpoint(handle, timestamp, node_handle, rmw_handle, service_name);
        self.clients.insert(row);
    }

    pub fn add_timer(&mut self, handle: Handle, timestamp: u64, period: i64, tid: Option<i64>) {
        self.timers.insert(Timer {
            handle,
            timestamp,
            period,
            tid,
            destroyed_at: None,
        });
    }

    pub fn add_timer_node_link(&mut self, timer_handle: Handle, timestamp: u64, node_handle: Handle) {
        let link = TimerNodeLink {
            timer: self.timers.reference(timer_handle, timestamp),
            timestamp,
            node: self.nodes.reference(node_handle, timestamp),
        };
        self.timer_node_links.push(link);
    }

    /// Reference to the owner of a callback, resolved in the table for `kind`
    pub fn owner_reference(&self, kind: EntityKind, handle: Handle, at: u64) -> Option<CallbackOwner> {
        Some(match kind {
            EntityKind::Timer => CallbackOwner::Timer(self.timers.reference(handle, at)),
            EntityKind::SubscriptionObject => {
                CallbackOwner::Subscription(self.subscription_objects.reference(handle, at))
            }
            EntityKind::Service => CallbackOwner::Service(self.services.reference(handle, at)),
            EntityKind::Client => CallbackOwner::Client(self.clients.reference(handle, at)),
            _ => return None,
        })
    }

    pub fn add_callback_object(&mut self, handle: Handle, timestamp: u64, owner: CallbackOwner) {
        if !owner.reference().is_resolved() {
            debug!(
                "Callback 0x{:x} references unknown {} 0x{:x} at {}",
                handle,
                owner.label(),
                owner.reference().handle,
                timestamp
            );
        }
        self.callback_objects.insert(CallbackObject {
            handle,
            timestamp,
            owner,
        });
    }

    pub fn add_callback_symbol(&mut self, handle: Handle, timestamp: u64, symbol: String) {
        self.callback_symbols.insert(CallbackSymbol {
            handle,
            timestamp,
            symbol,
        });
    }

    /// Open a new callback instance
    ///
    /// A still-open previous instance of the same callback is left
    /// incomplete and flagged.
    pub fn start_callback(&mut self, callback_object: Handle, timestamp: u64, intra_process: bool) {
        if let Some(previous) = self.open_callbacks.remove(&callback_object) {
            debug!(
                "Callback 0x{:x} restarted at {} before ending",
                callback_object, timestamp
            );
            self.callback_instances[previous].anomaly = Some(PairingAnomaly::RestartedBeforeEnd);
        }
        let callback = self.callback_objects.reference(callback_object, timestamp);
        self.open_callbacks
            .insert(callback_object, self.callback_instances.len());
        self.callback_instances.push(CallbackInstance {
            callback,
            start_timestamp: Some(timestamp),
            end_timestamp: None,
            duration: None,
            intra_process,
            anomaly: None,
        });
    }

    /// Close the most recently opened instance of a callback
    pub fn end_callback(&mut self, callback_object: Handle, timestamp: u64) {
        match self.open_callbacks.remove(&callback_object) {
            Some(index) => {
                let instance = &mut self.callback_instances[index];
                let start = instance.start_timestamp.unwrap_or(timestamp);
                instance.end_timestamp = Some(timestamp);
                instance.duration = Some(timestamp.saturating_sub(start));
            }
            None => {
                debug!(
                    "No matching callback start for callback object 0x{:x} at {}",
                    callback_object, timestamp
                );
                let callback = self.callback_objects.reference(callback_object, timestamp);
                self.callback_instances.push(CallbackInstance {
                    callback,
                    start_timestamp: None,
                    end_timestamp: Some(timestamp),
                    duration: None,
                    intra_process: false,
                    anomaly: Some(PairingAnomaly::UnmatchedEnd),
                });
            }
        }
    }

    /// Record a publish; `publisher_handle` is only known at the rcl layer
    pub fn add_publish_instance(
        &mut self,
        layer: MessageLayer,
        publisher_handle: Option<Handle>,
        timestamp: u64,
        message: Handle,
    ) {
        let publisher = publisher_handle.map(|handle| self.publishers.reference(handle, timestamp));
        self.publish_instances.push(PublishInstance {
            layer,
            publisher,
            timestamp,
            message,
        });
    }

    pub fn add_rmw_take_instance(
        &mut self,
        rmw_subscription_handle: Handle,
        timestamp: u64,
        message: Handle,
        source_timestamp: i64,
        taken: bool,
    ) {
        let rmw_subscription = self
            .rmw_subscriptions
            .reference(rmw_subscription_handle, timestamp);
        self.take_instances.push(TakeInstance {
            layer: MessageLayer::Rmw,
            rmw_subscription: Some(rmw_subscription),
            timestamp,
            message,
            source_timestamp: Some(source_timestamp),
            taken: Some(taken),
        });
    }

    /// Record a take at the rcl or rclcpp layer, which only report the message
    pub fn add_take_instance(&mut self, layer: MessageLayer, timestamp: u64, message: Handle) {
        self.take_instances.push(TakeInstance {
            layer,
            rmw_subscription: None,
            timestamp,
            message,
            source_timestamp: None,
            taken: None,
        });
    }

    /// Record an executor dispatch, resolving the rcl handle to whichever
    /// executable was most recently created with it
    pub fn add_executor_execution(&mut self, handle: Handle, timestamp: u64) {
        let candidates = [
            self.subscriptions
                .resolve(handle, timestamp)
                .map(|s| (EntityKind::Subscription, s.key())),
            self.timers
                .resolve(handle, timestamp)
                .map(|t| (EntityKind::Timer, t.key())),
            self.services
                .resolve(handle, timestamp)
                .map(|s| (EntityKind::Service, s.key())),
            self.clients
                .resolve(handle, timestamp)
                .map(|c| (EntityKind::Client, c.key())),
        ];
        // Ties keep the first candidate in the order above
        let target = candidates.into_iter().flatten().fold(
            None,
            |best: Option<(EntityKind, EntityKey)>, candidate| match best {
                Some(b) if b.1.created_at >= candidate.1.created_at => Some(b),
                _ => Some(candidate),
            },
        );
        self.executor_executions.push(ExecutorExecution {
            timestamp,
            handle,
            kind: target.map(|(kind, _)| kind),
            resolved: target.map(|(_, key)| key),
        });
    }

    pub fn add_lifecycle_state_machine(&mut self, handle: Handle, timestamp: u64, node_handle: Handle) {
        let node = self.nodes.reference(node_handle, timestamp);
        self.lifecycle_state_machines.insert(LifecycleStateMachine {
            handle,
            timestamp,
            node,
        });
    }

    pub fn add_lifecycle_transition(
        &mut self,
        state_machine: Handle,
        start_label: String,
        goal_label: String,
        timestamp: u64,
    ) {
        let state_machine = self.lifecycle_state_machines.reference(state_machine, timestamp);
        self.lifecycle_transitions.push(LifecycleTransition {
            state_machine,
            start_label,
            goal_label,
            timestamp,
        });
    }

    /// Mark the entity alive at `timestamp` as destroyed
    ///
    /// Returns `false` if no such entity is known.
    pub fn destroy(&mut self, kind: DestroyableKind, handle: Handle, timestamp: u64) -> bool {
        match kind {
            DestroyableKind::Node => self.nodes.mark_destroyed(handle, timestamp),
            DestroyableKind::Publisher => self.publishers.mark_destroyed(handle, timestamp),
            DestroyableKind::Subscription => self.subscriptions.mark_destroyed(handle, timestamp),
            DestroyableKind::Service => self.services.mark_destroyed(handle, timestamp),
            DestroyableKind::Client => self.clients.mark_destroyed(handle, timestamp),
            DestroyableKind::Timer => self.timers.mark_destroyed(handle, timestamp),
        }
    }

    /// Number of callback instances currently open
    pub fn open_callback_count(&self) -> usize {
        self.open_callbacks.len()
    }

    fn duplicate_rows(&self) -> usize {
        self.contexts.duplicates()
            + self.nodes.duplicates()
            + self.publishers.duplicates()
            + self.rmw_publishers.duplicates()
            + self.subscriptions.duplicates()
            + self.rmw_subscriptions.duplicates()
            + self.subscription_objects.duplicates()
            + self.services.duplicates()
            + self.clients.duplicates()
            + self.timers.duplicates()
            + self.callback_objects.duplicates()
            + self.callback_symbols.duplicates()
            + self.lifecycle_state_machines.duplicates()
    }
}

impl ModelBuilder for Ros2Builder {
    type Model = Ros2DataModel;

    fn build(self) -> Ros2DataModel {
        let duplicate_rows = self.duplicate_rows();
        if !self.open_callbacks.is_empty() {
            debug!(
                "{} callback instance(s) never ended",
                self.open_callbacks.len()
            );
        }
        Ros2DataModel {
            contexts: self.contexts.finish(),
            nodes: self.nodes.finish(),
            publishers: self.publishers.finish(),
            rmw_publishers: self.rmw_publishers.finish(),
            subscriptions: self.subscriptions.finish(),
            rmw_subscriptions: self.rmw_subscriptions.finish(),
            subscription_objects: self.subscription_objects.finish(),
            services: self.services.finish(),
            clients: self.clients.finish(),
            timers: self.timers.finish(),
            timer_node_links: self.timer_node_links.into(),
            callback_objects: self.callback_objects.finish(),
            callback_symbols: self.callback_symbols.finish(),
            callback_instances: self.callback_instances.into(),
            publish_instances: self.publish_instances.into(),
            take_instances: self.take_instances.into(),
            executor_executions: self.executor_executions.into(),
            lifecycle_state_machines: self.lifecycle_state_machines.finish(),
            lifecycle_transitions: self.lifecycle_transitions.into(),
            duplicate_rows,
        }
    }
}
