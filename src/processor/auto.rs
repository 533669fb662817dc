//! Built-in handler selection.
//!
//! [`HandlerSet::applicable`] picks every built-in handler whose required
//! events are all present in a stream, so a trace can be processed without
//! naming handlers up front.

use super::{
    CpuTimeHandler, EventHandler, KernelMemoryUsageHandler, ProfileHandler, Ros2Handler,
    UserspaceMemoryUsageHandler,
};
use crate::parser::Handle;
use clap::ValueEnum;
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Built-in handler kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum HandlerKind {
    Ros2,
    Cpu,
    UstMemory,
    KernelMemory,
    Profile,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 5] = [
        HandlerKind::Ros2,
        HandlerKind::Cpu,
        HandlerKind::UstMemory,
        HandlerKind::KernelMemory,
        HandlerKind::Profile,
    ];
}

/// The built-in handlers selected for one pass
///
/// Handlers are registered with the processor in the field order below.
#[derive(Debug, Default)]
pub struct HandlerSet {
    pub ros2: Option<Ros2Handler>,
    pub cpu_time: Option<CpuTimeHandler>,
    pub ust_memory: Option<UserspaceMemoryUsageHandler>,
    pub kernel_memory: Option<KernelMemoryUsageHandler>,
    pub profile: Option<ProfileHandler>,
}

impl HandlerSet {
    /// Instantiate the given handler kinds
    ///
    /// **Public** - used when handlers are chosen explicitly
    pub fn from_kinds(kinds: &[HandlerKind], symbols: HashMap<Handle, String>) -> Self {
        let mut set = Self::default();
        let mut symbols = Some(symbols);
        for kind in kinds {
            match kind {
                HandlerKind::Ros2 => set.ros2 = Some(Ros2Handler::new()),
                HandlerKind::Cpu => set.cpu_time = Some(CpuTimeHandler::new()),
                HandlerKind::UstMemory => set.ust_memory = Some(UserspaceMemoryUsageHandler::new()),
                HandlerKind::KernelMemory => {
                    set.kernel_memory = Some(KernelMemoryUsageHandler::new())
                }
                HandlerKind::Profile => {
                    let symbols = symbols.take().unwrap_or_default();
                    set.profile = Some(ProfileHandler::new(symbols));
                }
            }
        }
        set
    }

    /// Every built-in handler whose non-empty required event set is fully
    /// present in `event_names`
    ///
    /// **Public** - used when no handler is named
    pub fn applicable(event_names: &BTreeSet<String>, symbols: HashMap<Handle, String>) -> Self {
        let mut candidates = Self::from_kinds(&HandlerKind::ALL, HashMap::new());
        let kinds: Vec<HandlerKind> = candidates
            .entries()
            .into_iter()
            .filter(|(kind, handler)| {
                let required = handler.required_events();
                let fits = !required.is_empty()
                    && required.iter().all(|name| event_names.contains(*name));
                debug!(
                    "Handler {:?}: {}",
                    kind,
                    if fits { "applicable" } else { "not applicable" }
                );
                fits
            })
            .map(|(kind, _)| kind)
            .collect();

        info!("Auto-selected handlers: {:?}", kinds);
        Self::from_kinds(&kinds, symbols)
    }

    /// Selected kinds with their handlers, in registration order
    fn entries(&mut self) -> Vec<(HandlerKind, &mut dyn EventHandler)> {
        let mut entries: Vec<(HandlerKind, &mut dyn EventHandler)> = Vec::new();
        if let Some(h) = self.ros2.as_mut() {
            entries.push((HandlerKind::Ros2, h));
        }
        if let Some(h) = self.cpu_time.as_mut() {
            entries.push((HandlerKind::Cpu, h));
        }
        if let Some(h) = self.ust_memory.as_mut() {
            entries.push((HandlerKind::UstMemory, h));
        }
        if let Some(h) = self.kernel_memory.as_mut() {
            entries.push((HandlerKind::KernelMemory, h));
        }
        if let Some(h) = self.profile.as_mut() {
            entries.push((HandlerKind::Profile, h));
        }
        entries
    }

    /// Borrow the selected handlers for a processor
    pub fn as_handlers(&mut self) -> Vec<&mut dyn EventHandler> {
        self.entries().into_iter().map(|(_, h)| h).collect()
    }

    pub fn kinds(&mut self) -> Vec<HandlerKind> {
        self.entries().into_iter().map(|(k, _)| k).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ros2.is_none()
            && self.cpu_time.is_none()
            && self.ust_memory.is_none()
            && self.kernel_memory.is_none()
            && self.profile.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::{kmem, ros2, ust_libc, SCHED_SWITCH};

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_applicable_requires_full_set() {
        let present = names(&[ros2::RCL_INIT, SCHED_SWITCH, ust_libc::MALLOC, kmem::PAGE_ALLOC]);
        let mut set = HandlerSet::applicable(&present, HashMap::new());

        assert_eq!(set.kinds(), vec![HandlerKind::Ros2, HandlerKind::Cpu]);
    }

    #[test]
    fn test_applicable_nothing() {
        let set = HandlerSet::applicable(&names(&["unrelated"]), HashMap::new());
        assert!(set.is_empty());
    }

    #[test]
    fn test_from_kinds_order() {
        let mut set = HandlerSet::from_kinds(
            &[HandlerKind::Profile, HandlerKind::Ros2],
            HashMap::new(),
        );
        let handlers = set.as_handlers();
        assert_eq!(handlers[0].name(), Ros2Handler::NAME);
        assert_eq!(handlers[1].name(), ProfileHandler::NAME);
    }
}
