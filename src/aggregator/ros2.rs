//! Queries over a finalized ROS 2 data model.

use crate::data_model::ros2::{CallbackOwner, CallbackSymbol, LifecycleTransition, Node};
use crate::data_model::{EntityKey, EntityRef, Ros2DataModel};
use crate::parser::Handle;
use crate::utils::time::ns_to_ms;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const STD_ALLOCATOR: &str = "_<std::allocator<void>>";
const STD_DEFAULT_DELETE: &str = "std::default_delete";
const STD_BIND: &str = "std::_Bind<";

/// Completed executions of one callback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallbackDurations {
    /// `(start_timestamp, duration)` in table order
    pub durations: Vec<(u64, u64)>,
    /// Instances left out because they never completed
    pub incomplete: usize,
}

impl CallbackDurations {
    pub fn total(&self) -> u64 {
        self.durations.iter().map(|(_, d)| d).sum()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.durations.is_empty() {
            None
        } else {
            Some(self.total() as f64 / self.durations.len() as f64)
        }
    }

    pub fn max(&self) -> Option<u64> {
        self.durations.iter().map(|(_, d)| *d).max()
    }
}

/// Durations of every completed instance of one callback object version
///
/// **Public** - main per-callback query
///
/// Instances are matched on the callback version they resolved to, so a
/// reused handle never merges two callbacks. Instances with no duration are
/// excluded (never zero-filled) and counted in `incomplete`.
pub fn get_callback_durations(model: &Ros2DataModel, callback: EntityKey) -> CallbackDurations {
    let mut result = CallbackDurations::default();
    for instance in model
        .callback_instances
        .iter()
        .filter(|i| i.callback.resolved == Some(callback))
    {
        match (instance.start_timestamp, instance.duration) {
            (Some(start), Some(duration)) => result.durations.push((start, duration)),
            _ => result.incomplete += 1,
        }
    }
    result
}

/// Callback object versions with at least one instance, in first-seen order
///
/// Instances of unknown callbacks are left out; they show up in
/// [`Ros2DataModel::anomalies`].
pub fn get_callback_objects(model: &Ros2DataModel) -> Vec<EntityKey> {
    let mut seen = Vec::new();
    for key in model.callback_instances.iter().filter_map(|i| i.callback.resolved) {
        if !seen.contains(&key) {
            seen.push(key);
        }
    }
    seen
}

/// **Private** - last symbol registered while this callback version was alive
fn callback_symbol(model: &Ros2DataModel, callback: EntityKey) -> Option<&CallbackSymbol> {
    let next_version = model
        .callback_objects
        .versions(callback.handle)
        .map(|c| c.timestamp)
        .find(|ts| *ts > callback.created_at)
        .unwrap_or(u64::MAX);
    model
        .callback_symbols
        .versions(callback.handle)
        .filter(|s| s.timestamp >= callback.created_at && s.timestamp < next_version)
        .last()
}

/// Prettified symbol of one callback object version
pub fn get_callback_symbol(model: &Ros2DataModel, callback: EntityKey) -> Option<String> {
    callback_symbol(model, callback).map(|s| prettify_symbol(&s.symbol))
}

/// Prettified symbol of every executed callback object version
///
/// **Public** - for reports
///
/// Callbacks without a registered symbol are left out.
pub fn get_callback_symbols(model: &Ros2DataModel) -> BTreeMap<EntityKey, String> {
    get_callback_objects(model)
        .into_iter()
        .filter_map(|key| get_callback_symbol(model, key).map(|symbol| (key, symbol)))
        .collect()
}

/// Make a demangled C++ callback symbol readable
///
/// Strips `std::allocator<void>` and `std::default_delete<...>` template
/// arguments and replaces `std::_Bind` placeholder arguments with `?`.
pub fn prettify_symbol(original: &str) -> String {
    let mut pretty: String = original.chars().filter(|c| *c != ' ').collect();
    pretty = pretty.replace(STD_ALLOCATOR, "");

    if let Some(start) = pretty.find(STD_DEFAULT_DELETE) {
        let open = start + STD_DEFAULT_DELETE.len();
        let mut level = 0usize;
        let mut close = None;
        for (i, b) in pretty.bytes().enumerate().skip(open + 1) {
            match b {
                b'<' => level += 1,
                b'>' if level == 0 => {
                    close = Some(i);
                    break;
                }
                b'>' => level -= 1,
                _ => {}
            }
        }
        if let Some(close) = close {
            pretty.replace_range(start..=close, "");
        }
    }

    if pretty.starts_with(STD_BIND) {
        pretty = pretty.replace(STD_BIND, "");
        pretty.pop();
        if let Some(from) = pretty.find('*') {
            if let Some(to) = pretty[from..].find(')').map(|i| from + i) {
                pretty.replace_range(from..=to, "?");
            }
        }
    }

    pretty = pretty.replace(",>", ">");

    if let Some(rest) = pretty.strip_prefix("void") {
        pretty = format!("void {}", rest);
    }
    if let Some(rest) = pretty.strip_suffix("const") {
        pretty = format!("{} const", rest);
    }
    pretty
}

/// Human-readable description of a callback's owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerInfo {
    pub kind: &'static str,
    pub fields: Vec<(&'static str, String)>,
}

impl fmt::Display for OwnerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- ", self.kind)?;
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();
        write!(f, "{}", fields.join(", "))
    }
}

/// Describe the owner of a callback object version
///
/// **Public** - dispatches on the owner tag
///
/// # Returns
/// `None` if the callback is unknown or its owner reference is dangling
pub fn get_callback_owner_info(model: &Ros2DataModel, callback: EntityKey) -> Option<OwnerInfo> {
    let callback = model.callback_objects.get(callback)?;
    let owner = callback.owner;
    let key = owner.reference().resolved?;

    let fields = match owner {
        CallbackOwner::Timer(_) => {
            let timer = model.timers.get(key)?;
            let mut fields = node_fields_for_timer(model, timer.handle, timer.timestamp);
            if fields.is_empty() {
                fields.push(("tid", display_opt(timer.tid)));
            }
            fields.push(("period", format!("{:.0} ms", ns_to_ms(timer.period.max(0) as u64))));
            fields
        }
        CallbackOwner::Subscription(_) => {
            let object = model.subscription_objects.get(key)?;
            let subscription = model.subscriptions.get(object.subscription.resolved?)?;
            let mut fields = node_fields(model, &subscription.node);
            fields.push(("topic", subscription.topic_name.clone()));
            fields
        }
        CallbackOwner::Service(_) => {
            let service = model.services.get(key)?;
            let mut fields = node_fields(model, &service.node);
            fields.push(("service", service.service_name.clone()));
            fields
        }
        CallbackOwner::Client(_) => {
            let client = model.clients.get(key)?;
            let mut fields = node_fields(model, &client.node);
            fields.push(("service", client.service_name.clone()));
            fields
        }
    };

    Some(OwnerInfo {
        kind: owner.label(),
        fields,
    })
}

/// **Private** - node name and tid of a resolved node reference
fn node_fields(model: &Ros2DataModel, node: &EntityRef) -> Vec<(&'static str, String)> {
    node.resolved
        .and_then(|key| model.nodes.get(key))
        .map(|n| vec![("node", n.name.clone()), ("tid", display_opt(n.tid))])
        .unwrap_or_default()
}

/// **Private** - node of a timer through its node link, if any
fn node_fields_for_timer(
    model: &Ros2DataModel,
    timer: Handle,
    created_at: u64,
) -> Vec<(&'static str, String)> {
    model
        .timer_node_links
        .iter()
        .filter(|l| l.timer.resolved.is_some_and(|k| k.handle == timer && k.created_at == created_at))
        .last()
        .map(|l| node_fields(model, &l.node))
        .unwrap_or_default()
}

fn display_opt(value: Option<i64>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

/// Thread id of the node with this name
///
/// With several nodes sharing the name, the most recently created wins.
pub fn get_node_tid_from_name(model: &Ros2DataModel, node_name: &str) -> Option<i64> {
    model
        .nodes
        .iter()
        .filter(|n| n.name == node_name)
        .max_by_key(|n| n.timestamp)
        .and_then(|n| n.tid)
}

/// Names of all nodes created on a thread, in creation order
pub fn get_node_names_from_tid(model: &Ros2DataModel, tid: i64) -> Vec<String> {
    let mut nodes: Vec<&Node> = model.nodes.iter().filter(|n| n.tid == Some(tid)).collect();
    nodes.sort_by_key(|n| n.timestamp);
    nodes.into_iter().map(|n| n.name.clone()).collect()
}

/// Lifecycle transitions of every state machine attached to a node handle
pub fn get_lifecycle_transitions(model: &Ros2DataModel, node_handle: Handle) -> Vec<&LifecycleTransition> {
    model
        .lifecycle_transitions
        .iter()
        .filter(|t| {
            t.state_machine
                .resolved
                .and_then(|key| model.lifecycle_state_machines.get(key))
                .and_then(|m| m.node.resolved)
                .is_some_and(|node| node.handle == node_handle)
        })
        .collect()
}
