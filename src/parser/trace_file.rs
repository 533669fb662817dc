//! Loader for converted trace files.
//!
//! A converted trace is a JSON-lines file with one event per line:
//!
//! ```text
//! {"name": "sched_switch", "timestamp": 1000, "fields": {"cpu_id": 0, "prev_tid": 1, "next_tid": 2}}
//! ```
//!
//! Decoding the native binary trace format is done upstream; this loader only
//! reads the cached, already-decoded stream.

use super::event::{Event, EventSource};
use crate::utils::error::LoadError;
use log::{debug, info};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// An in-memory event stream with its distinct event names
#[derive(Debug, Clone, Default)]
pub struct Trace {
    events: Vec<Event>,
    names: BTreeSet<String>,
}

impl Trace {
    pub fn from_events(events: Vec<Event>) -> Self {
        let names = events.iter().map(|e| e.name.clone()).collect();
        Self { events, names }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSource for Trace {
    fn events(&self) -> &[Event] {
        &self.events
    }

    fn event_names(&self) -> BTreeSet<String> {
        self.names.clone()
    }
}

/// Load a converted trace file
///
/// **Public** - main entry point for loading
///
/// # Errors
/// * `LoadError::Io` - File cannot be opened or read
/// * `LoadError::Json` - A line is not a valid event
pub fn load_file(path: impl AsRef<Path>) -> Result<Trace, LoadError> {
    let path = path.as_ref();
    info!("Loading events from: {}", path.display());

    let file = File::open(path)?;
    let trace = read_events(BufReader::new(file))?;

    info!(
        "Loaded {} events ({} distinct names)",
        trace.len(),
        trace.names.len()
    );
    Ok(trace)
}

/// Read JSON-lines events from any buffered reader
///
/// Blank lines are skipped. Line numbers in errors are 1-based.
pub fn read_events(reader: impl BufRead) -> Result<Trace, LoadError> {
    let mut events = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: Event = serde_json::from_str(&line).map_err(|source| LoadError::Json {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }

    debug!("Read {} events", events.len());
    Ok(Trace::from_events(events))
}
