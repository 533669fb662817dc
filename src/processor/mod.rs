//! Event dispatch: handlers, the processor, and handler selection.
//!
//! A [`Processor`] runs one pass over an [`EventSource`]:
//!
//! 1. Coverage check - every required event name of every handler must
//!    occur in the stream (unless running in [`CoverageMode::Partial`]).
//! 2. Dispatch - each event goes to every interested handler, in
//!    registration order.
//! 3. Finalize - every handler freezes its data model, in registration
//!    order.
//!
//! Any error aborts the pass and resets every handler, so callers never see
//! a half-built model.

pub mod auto;
pub mod cpu_time;
pub mod memory_usage;
pub mod profile;
pub mod progress;
pub mod ros2;

use crate::data_model::{ModelBuilder, ModelSlot};
use crate::parser::{Event, EventMetadata, EventSource};
use crate::utils::error::{FieldError, ProcessError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;

pub use auto::{HandlerKind, HandlerSet};
pub use cpu_time::CpuTimeHandler;
pub use memory_usage::{KernelMemoryUsageHandler, UserspaceMemoryUsageHandler};
pub use profile::ProfileHandler;
pub use progress::{LogProgress, ProgressObserver};
pub use ros2::Ros2Handler;

/// Policy for required events that never occur in the stream
///
/// There is deliberately no default: callers pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageMode {
    /// Abort with [`ProcessError::RequiredEventNotFound`]
    Strict,
    /// Log a warning and process what is there
    Partial,
}

/// Which event names a handler wants to receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventInterest {
    All,
    Only(&'static [&'static str]),
}

impl EventInterest {
    pub fn accepts(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(&name),
        }
    }

    pub fn names(&self) -> &'static [&'static str] {
        match self {
            Self::All => &[],
            Self::Only(names) => names,
        }
    }
}

/// A domain handler owning exactly one data model
///
/// `handle` must only depend on the model built so far and the event.
pub trait EventHandler {
    /// Short handler name used in errors and reports
    fn name(&self) -> &'static str;

    /// Events this handler is dispatched
    fn interest(&self) -> EventInterest;

    /// Events that must occur in the stream for this handler's model to be
    /// meaningful; empty means best-effort
    fn required_events(&self) -> &'static [&'static str] {
        &[]
    }

    /// Apply one event to the model being built
    ///
    /// # Errors
    /// * `ProcessError::InvalidEvent` - A needed field is missing or mistyped
    /// * `ProcessError::AlreadyFinalized` - The model is already frozen
    fn handle(&mut self, event: &Event, metadata: &EventMetadata) -> Result<(), ProcessError>;

    /// Freeze the model; repeated calls are no-ops
    fn finalize(&mut self);

    /// Throw away everything built so far
    fn discard(&mut self);

    fn is_finalized(&self) -> bool;
}

/// A required event that was absent from the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEvent {
    pub event: String,
    pub handlers: Vec<String>,
}

/// Outcome of a successful pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub mode: CoverageMode,
    pub handlers: Vec<String>,
    pub events_total: usize,
    /// Events handed to at least one handler
    pub events_dispatched: usize,
    /// Required events tolerated in partial mode, sorted by name
    pub missing_events: Vec<MissingEvent>,
}

/// Runs one dispatch pass over a set of handlers
pub struct Processor<'h> {
    handlers: Vec<&'h mut dyn EventHandler>,
    mode: CoverageMode,
    progress: Option<Box<dyn ProgressObserver + 'h>>,
}

impl<'h> Processor<'h> {
    /// Create a processor over an ordered, non-empty set of handlers
    ///
    /// **Public** - main entry point for processing
    ///
    /// # Errors
    /// * `ProcessError::Configuration` - If no handler is given
    pub fn new(
        handlers: Vec<&'h mut dyn EventHandler>,
        mode: CoverageMode,
    ) -> Result<Self, ProcessError> {
        if handlers.is_empty() {
            return Err(ProcessError::Configuration(
                "at least one event handler is required".to_string(),
            ));
        }
        Ok(Self {
            handlers,
            mode,
            progress: None,
        })
    }

    /// Attach a progress observer
    pub fn with_progress(mut self, observer: impl ProgressObserver + 'h) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    pub fn mode(&self) -> CoverageMode {
        self.mode
    }

    /// Union of required events, each with the handlers requiring it
    ///
    /// **Public** - used for the coverage check and the `events` command
    pub fn required_events(&self) -> BTreeMap<&'static str, Vec<&'static str>> {
        let mut required: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
        for handler in &self.handlers {
            for event in handler.required_events() {
                required.entry(event).or_default().push(handler.name());
            }
        }
        required
    }

    /// Check that every required event occurs in `present`
    ///
    /// # Returns
    /// The missing events (empty when fully covered). In strict mode the
    /// first missing name, in lexicographic order, is an error instead.
    ///
    /// # Errors
    /// * `ProcessError::RequiredEventNotFound` - In strict mode only
    pub fn check_coverage(
        &self,
        present: &BTreeSet<String>,
    ) -> Result<Vec<MissingEvent>, ProcessError> {
        let missing: Vec<MissingEvent> = self
            .required_events()
            .into_iter()
            .filter(|(event, _)| !present.contains(*event))
            .map(|(event, handlers)| MissingEvent {
                event: event.to_string(),
                handlers: handlers.into_iter().map(str::to_string).collect(),
            })
            .collect();

        match (self.mode, missing.first()) {
            (CoverageMode::Strict, Some(first)) => Err(ProcessError::RequiredEventNotFound {
                event: first.event.clone(),
                handlers: first.handlers.clone(),
            }),
            _ => {
                for gap in &missing {
                    warn!(
                        "Required event '{}' not found (needed by {}); continuing in partial mode",
                        gap.event,
                        gap.handlers.join(", ")
                    );
                }
                Ok(missing)
            }
        }
    }

    /// Run the full pass: coverage check, dispatch, finalize
    ///
    /// **Public** - main entry point for processing
    ///
    /// # Errors
    /// * `ProcessError::RequiredEventNotFound` - Strict mode and a required
    ///   event never occurs
    /// * `ProcessError::AlreadyFinalized` - A handler was already used
    /// * `ProcessError::InvalidEvent` - A handler could not read an event
    ///
    /// On any error every handler is reset to an empty, unfinalized model.
    pub fn process<S: EventSource + ?Sized>(
        &mut self,
        source: &S,
    ) -> Result<ProcessSummary, ProcessError> {
        if let Some(done) = self.handlers.iter().find(|h| h.is_finalized()) {
            return Err(ProcessError::AlreadyFinalized(done.name().to_string()));
        }

        let missing_events = self.check_coverage(&source.event_names())?;

        let start_time = Instant::now();
        let total = source.event_count();
        info!(
            "Processing {} events with {} handler(s)",
            total,
            self.handlers.len()
        );

        match self.dispatch_all(source.events(), total) {
            Ok(events_dispatched) => {
                for handler in self.handlers.iter_mut() {
                    handler.finalize();
                }
                info!(
                    "Processed {} events in {:.2}s",
                    total,
                    start_time.elapsed().as_secs_f64()
                );
                Ok(ProcessSummary {
                    mode: self.mode,
                    handlers: self.handlers.iter().map(|h| h.name().to_string()).collect(),
                    events_total: total,
                    events_dispatched,
                    missing_events,
                })
            }
            Err(e) => {
                for handler in self.handlers.iter_mut() {
                    handler.discard();
                }
                Err(e)
            }
        }
    }

    /// Dispatch every event; returns how many reached at least one handler
    ///
    /// **Private** - internal helper for process
    fn dispatch_all(&mut self, events: &[Event], total: usize) -> Result<usize, ProcessError> {
        // event name -> interested handler indices, in registration order
        let mut routes: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut dispatched = 0;

        if let Some(progress) = self.progress.as_mut() {
            progress.on_start(total);
        }

        for (processed, event) in events.iter().enumerate() {
            let handlers = &self.handlers;
            let route = routes.entry(event.name.as_str()).or_insert_with(|| {
                handlers
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| h.interest().accepts(&event.name))
                    .map(|(i, _)| i)
                    .collect()
            });

            if !route.is_empty() {
                let metadata = EventMetadata::from_event(event)
                    .map_err(|e| e.in_event(&event.name, event.timestamp))?;
                for &index in route.iter() {
                    self.handlers[index].handle(event, &metadata)?;
                }
                dispatched += 1;
            }

            if let Some(progress) = self.progress.as_mut() {
                progress.on_event(processed + 1);
            }
        }

        if let Some(progress) = self.progress.as_mut() {
            progress.on_finish(events.len());
        }
        debug!("Dispatched {} of {} events", dispatched, events.len());
        Ok(dispatched)
    }
}

/// The builder of a slot that is still building
///
/// **Public** - shared by the handler implementations
///
/// # Errors
/// * `ProcessError::AlreadyFinalized` - The slot was finalized
pub fn building<'a, B: ModelBuilder>(
    slot: &'a mut ModelSlot<B>,
    handler: &str,
) -> Result<&'a mut B, ProcessError> {
    slot.builder_mut()
        .ok_or_else(|| ProcessError::AlreadyFinalized(handler.to_string()))
}

/// Attach event context to a field error
pub(crate) fn field<T>(event: &Event, result: Result<T, FieldError>) -> Result<T, ProcessError> {
    result.map_err(|e| e.in_event(&event.name, event.timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::Table;

    #[derive(Default)]
    struct NamesBuilder(Vec<String>);

    impl ModelBuilder for NamesBuilder {
        type Model = Table<String>;

        fn build(self) -> Table<String> {
            self.0.into()
        }
    }

    struct Recorder {
        name: &'static str,
        interest: EventInterest,
        required: &'static [&'static str],
        slot: ModelSlot<NamesBuilder>,
    }

    impl Recorder {
        fn new(
            name: &'static str,
            interest: EventInterest,
            required: &'static [&'static str],
        ) -> Self {
            Self {
                name,
                interest,
                required,
                slot: ModelSlot::default(),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.slot.model().map(|t| t.rows().to_vec()).unwrap_or_default()
        }
    }

    impl EventHandler for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn interest(&self) -> EventInterest {
            self.interest
        }

        fn required_events(&self) -> &'static [&'static str] {
            self.required
        }

        fn handle(&mut self, event: &Event, _metadata: &EventMetadata) -> Result<(), ProcessError> {
            if event.name == "bad" {
                field(event, event.get_int("missing"))?;
            }
            building(&mut self.slot, self.name)?.0.push(event.name.clone());
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

    fn stream(names: &[&str]) -> Vec<Event> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Event::new(*n, i as u64))
            .collect()
    }

    #[test]
    fn test_no_handlers_is_configuration_error() {
        let result = Processor::new(Vec::new(), CoverageMode::Strict);
        assert!(matches!(result, Err(ProcessError::Configuration(_))));
    }

    #[test]
    fn test_fan_out_dispatch() {
        let mut a = Recorder::new("a", EventInterest::Only(&["x", "y"]), &[]);
        let mut b = Recorder::new("b", EventInterest::All, &[]);
        let mut processor = Processor::new(vec![&mut a, &mut b], CoverageMode::Strict).unwrap();

        let summary = processor.process(&stream(&["x", "z", "y"])).unwrap();
        drop(processor);

        assert_eq!(summary.events_dispatched, 3);
        assert_eq!(a.seen(), vec!["x", "y"]);
        assert_eq!(b.seen(), vec!["x", "z", "y"]);
        assert!(a.is_finalized() && b.is_finalized());
    }

    #[test]
    fn test_missing_required_event_strict() {
        let mut a = Recorder::new("a", EventInterest::Only(&["x"]), &["x", "w"]);
        let mut b = Recorder::new("b", EventInterest::Only(&["x"]), &["w"]);
        let mut processor = Processor::new(vec![&mut a, &mut b], CoverageMode::Strict).unwrap();

        match processor.process(&stream(&["x"])) {
            Err(ProcessError::RequiredEventNotFound { event, handlers }) => {
                assert_eq!(event, "w");
                assert_eq!(handlers, vec!["a", "b"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        drop(processor);
        assert!(!a.is_finalized());
    }

    #[test]
    fn test_missing_required_event_partial() {
        let mut a = Recorder::new("a", EventInterest::Only(&["x"]), &["x", "w"]);
        let mut processor = Processor::new(vec![&mut a], CoverageMode::Partial).unwrap();

        let summary = processor.process(&stream(&["x"])).unwrap();
        assert_eq!(summary.missing_events.len(), 1);
        assert_eq!(summary.missing_events[0].event, "w");
    }

    #[test]
    fn test_error_discards_all_models() {
        let mut a = Recorder::new("a", EventInterest::All, &[]);
        let mut b = Recorder::new("b", EventInterest::Only(&["x"]), &[]);
        let mut processor = Processor::new(vec![&mut a, &mut b], CoverageMode::Strict).unwrap();

        let result = processor.process(&stream(&["x", "bad"]));
        assert!(matches!(result, Err(ProcessError::InvalidEvent { .. })));
        drop(processor);

        assert!(!a.is_finalized());
        assert!(a.slot.builder().unwrap().0.is_empty());
        assert!(b.slot.builder().unwrap().0.is_empty());
    }

    #[test]
    fn test_second_pass_rejected() {
        let mut a = Recorder::new("a", EventInterest::All, &[]);
        let mut processor = Processor::new(vec![&mut a], CoverageMode::Strict).unwrap();

        processor.process(&stream(&["x"])).unwrap();
        assert!(matches!(
            processor.process(&stream(&["x"])),
            Err(ProcessError::AlreadyFinalized(_))
        ));
    }
}
