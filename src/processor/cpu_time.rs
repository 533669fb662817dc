//! Scheduler switch handler.

use super::{building, field, EventHandler, EventInterest};
use crate::data_model::{CpuTimeBuilder, CpuTimeDataModel, ModelSlot, SchedSwitch};
use crate::parser::{Event, EventMetadata};
use crate::utils::config::SCHED_SWITCH;
use crate::utils::error::ProcessError;

const EVENTS: &[&str] = &[SCHED_SWITCH];

/// Records every `sched_switch` with the core it happened on
#[derive(Debug, Default)]
pub struct CpuTimeHandler {
    slot: ModelSlot<CpuTimeBuilder>,
}

impl CpuTimeHandler {
    pub const NAME: &'static str = "cpu_time";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> Option<&CpuTimeDataModel> {
        self.slot.model()
    }

    pub fn into_data(self) -> Option<CpuTimeDataModel> {
        self.slot.into_model()
    }
}

impl EventHandler for CpuTimeHandler {
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
        let data = building(&mut self.slot, Self::NAME)?;
        let prev_state = match event.field("prev_state") {
            Some(_) => Some(field(event, event.get_int("prev_state"))?),
            None => None,
        };
        data.add_switch(SchedSwitch {
            timestamp: event.timestamp,
            cpu_id: field(event, metadata.require_cpu())?,
            prev_tid: field(event, event.get_int("prev_tid"))?,
            next_tid: field(event, event.get_int("next_tid"))?,
            prev_state,
        });
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

    #[test]
    fn test_switch_without_cpu_is_invalid() {
        let mut handler = CpuTimeHandler::new();
        let event = Event::new(SCHED_SWITCH, 1)
            .with_field("prev_tid", 1)
            .with_field("next_tid", 2);
        let metadata = EventMetadata::from_event(&event).unwrap();

        assert!(matches!(
            handler.handle(&event, &metadata),
            Err(ProcessError::InvalidEvent { .. })
        ));
    }

    #[test]
    fn test_records_switch() {
        let mut handler = CpuTimeHandler::new();
        let event = Event::new(SCHED_SWITCH, 1)
            .with_field("cpu_id", 3)
            .with_field("prev_tid", 1)
            .with_field("next_tid", 2)
            .with_field("prev_state", 1);
        let metadata = EventMetadata::from_event(&event).unwrap();
        handler.handle(&event, &metadata).unwrap();
        handler.finalize();

        let switch = &handler.data().unwrap().switches.rows()[0];
        assert_eq!(switch.cpu_id, 3);
        assert_eq!(switch.prev_state, Some(1));
    }
}
