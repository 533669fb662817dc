//! Function instrumentation handler.
//!
//! Consumes `-finstrument-functions` entry/exit events and the scheduler
//! switches of profiled threads.

use super::{building, field, EventHandler, EventInterest};
use crate::data_model::{ModelSlot, ProfileBuilder, ProfileDataModel};
use crate::parser::{Event, EventMetadata, Handle};
use crate::utils::config::{cyg_profile, SCHED_SWITCH};
use crate::utils::error::ProcessError;
use std::collections::HashMap;

const EVENTS: &[&str] = &[cyg_profile::FUNC_ENTRY, cyg_profile::FUNC_EXIT, SCHED_SWITCH];

/// Records function entries/exits, resolving addresses to names
#[derive(Debug, Default)]
pub struct ProfileHandler {
    slot: ModelSlot<ProfileBuilder>,
    symbols: HashMap<Handle, String>,
}

impl ProfileHandler {
    pub const NAME: &'static str = "profile";

    /// Create a handler with an address -> function name map
    ///
    /// Unknown addresses are rendered as `0x...`.
    pub fn new(symbols: HashMap<Handle, String>) -> Self {
        Self {
            slot: ModelSlot::default(),
            symbols,
        }
    }

    pub fn data(&self) -> Option<&ProfileDataModel> {
        self.slot.model()
    }

    pub fn into_data(self) -> Option<ProfileDataModel> {
        self.slot.into_model()
    }

    fn function_name(&self, address: Handle) -> String {
        self.symbols
            .get(&address)
            .cloned()
            .unwrap_or_else(|| format!("0x{:x}", address))
    }
}

impl EventHandler for ProfileHandler {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn interest(&self) -> EventInterest {
        EventInterest::Only(EVENTS)
    }

    fn required_events(&self) -> &'static [&'static str] {
        EVENTS
    }

    fn handle(&mut self, event: &Event, metadata: &EventMetadata) -> Result<(), ProcessError> {
        let ts = event.timestamp;
        match event.name.as_str() {
            SCHED_SWITCH => {
                let prev_tid = field(event, event.get_int("prev_tid"))?;
                let next_tid = field(event, event.get_int("next_tid"))?;
                building(&mut self.slot, Self::NAME)?.add_switch(ts, prev_tid, next_tid);
            }
            name => {
                let tid = field(event, metadata.require_tid())?;
                let address = field(event, event.get_handle("addr"))?;
                if name == cyg_profile::FUNC_ENTRY {
                    let function = self.function_name(address);
                    building(&mut self.slot, Self::NAME)?.add_entry(ts, tid, address, function);
                } else {
                    building(&mut self.slot, Self::NAME)?.add_exit(ts, tid, address);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::ProfileRecordKind;

    #[test]
    fn test_symbol_resolution() {
        let symbols = HashMap::from([(0x10, "main".to_string())]);
        let mut handler = ProfileHandler::new(symbols);

        for (ts, addr) in [(1, 0x10_u64), (2, 0x20_u64)] {
            let event = Event::new(cyg_profile::FUNC_ENTRY, ts)
                .with_field("vtid", 1)
                .with_field("addr", addr);
            let metadata = EventMetadata::from_event(&event).unwrap();
            handler.handle(&event, &metadata).unwrap();
        }
        handler.finalize();

        let names: Vec<String> = handler
            .data()
            .unwrap()
            .records
            .iter()
            .filter_map(|r| match &r.kind {
                ProfileRecordKind::Entry { function, .. } => Some(function.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["main", "0x20"]);
    }
}
