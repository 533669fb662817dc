//! Event records and the converted-trace loader.
//!
//! This module handles:
//! - The `Event` record and typed field access
//! - Per-event context metadata (cpu, pid, tid)
//! - Loading JSON-lines converted traces

pub mod event;
pub mod trace_file;

// Re-export main types
pub use event::{Event, EventMetadata, EventSource, FieldValue, Handle};
pub use trace_file::{load_file, read_events, Trace};
