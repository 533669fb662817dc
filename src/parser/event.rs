//! Event records as produced by the trace loader.
//!
//! An [`Event`] is an immutable `{name, timestamp, fields}` record. Handlers
//! read fields through the typed getters, which turn a missing or mistyped
//! field into a [`FieldError`].

use crate::utils::config::{parse_address, CPU_ID_FIELD, PID_FIELD_NAMES, PROCNAME_FIELD, TID_FIELD_NAMES};
use crate::utils::error::FieldError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Process-local, reusable identifier of a traced object (pointer-sized)
pub type Handle = u64;

/// Value of one event field
///
/// JSON numbers that fit in `i64` decode as `Int`, larger ones as `Handle`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Handle(Handle),
    Str(String),
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        Self::Handle(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// One timestamped instrumentation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Tracepoint name, e.g. `ros2:callback_start`
    pub name: String,

    /// Capture timestamp in nanoseconds
    pub timestamp: u64,

    /// Payload and context fields
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Event {
    pub fn new(name: impl Into<String>, timestamp: u64) -> Self {
        Self {
            name: name.into(),
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    fn require(&self, name: &str) -> Result<&FieldValue, FieldError> {
        self.field(name)
            .ok_or_else(|| FieldError::Missing(name.to_string()))
    }

    /// Read a signed integer field
    pub fn get_int(&self, name: &str) -> Result<i64, FieldError> {
        match self.require(name)? {
            FieldValue::Int(v) => Ok(*v),
            FieldValue::Handle(v) => i64::try_from(*v).map_err(|_| mismatch(name, "int64")),
            FieldValue::Str(_) => Err(mismatch(name, "int64")),
        }
    }

    /// Read a signed integer field, using `default` when it is absent
    pub fn get_int_or(&self, name: &str, default: i64) -> Result<i64, FieldError> {
        match self.get_int(name) {
            Err(FieldError::Missing(_)) => Ok(default),
            other => other,
        }
    }

    /// Read a non-negative integer field
    pub fn get_u64(&self, name: &str) -> Result<u64, FieldError> {
        match self.require(name)? {
            FieldValue::Int(v) => u64::try_from(*v).map_err(|_| mismatch(name, "unsigned integer")),
            FieldValue::Handle(v) => Ok(*v),
            FieldValue::Str(_) => Err(mismatch(name, "unsigned integer")),
        }
    }

    /// Read a handle field; hex strings (`0x...`) are accepted
    pub fn get_handle(&self, name: &str) -> Result<Handle, FieldError> {
        match self.require(name)? {
            // Pointers that went through a signed representation keep their bits
            FieldValue::Int(v) => Ok(*v as u64),
            FieldValue::Handle(v) => Ok(*v),
            FieldValue::Str(s) => parse_address(s).ok_or_else(|| mismatch(name, "handle")),
        }
    }

    /// Read a string field
    pub fn get_str(&self, name: &str) -> Result<&str, FieldError> {
        match self.require(name)? {
            FieldValue::Str(s) => Ok(s),
            _ => Err(mismatch(name, "string")),
        }
    }

    /// First present field out of several aliases
    fn first_int(&self, names: &[&str]) -> Result<Option<i64>, FieldError> {
        for name in names {
            if self.field(name).is_some() {
                return self.get_int(name).map(Some);
            }
        }
        Ok(None)
    }
}

fn mismatch(field: &str, expected: &'static str) -> FieldError {
    FieldError::TypeMismatch {
        field: field.to_string(),
        expected,
    }
}

/// Context information extracted from an event before dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMetadata {
    pub event_name: String,
    pub timestamp: u64,
    pub cpu_id: Option<u32>,
    pub procname: Option<String>,
    pub pid: Option<i64>,
    pub tid: Option<i64>,
}

impl EventMetadata {
    /// Extract metadata from the event's context fields
    ///
    /// Context fields are optional (kernel events have no procname, for
    /// instance), but a present field with the wrong type is an error.
    pub fn from_event(event: &Event) -> Result<Self, FieldError> {
        let cpu_id = match event.field(CPU_ID_FIELD) {
            Some(_) => Some(
                u32::try_from(event.get_u64(CPU_ID_FIELD)?)
                    .map_err(|_| mismatch(CPU_ID_FIELD, "cpu id"))?,
            ),
            None => None,
        };
        let procname = match event.field(PROCNAME_FIELD) {
            Some(_) => Some(event.get_str(PROCNAME_FIELD)?.to_string()),
            None => None,
        };

        Ok(Self {
            event_name: event.name.clone(),
            timestamp: event.timestamp,
            cpu_id,
            procname,
            pid: event.first_int(PID_FIELD_NAMES)?,
            tid: event.first_int(TID_FIELD_NAMES)?,
        })
    }

    /// Thread id, required by per-thread handlers
    pub fn require_tid(&self) -> Result<i64, FieldError> {
        self.tid
            .ok_or_else(|| FieldError::Missing(TID_FIELD_NAMES[0].to_string()))
    }

    /// CPU id, required by per-core handlers
    pub fn require_cpu(&self) -> Result<u32, FieldError> {
        self.cpu_id
            .ok_or_else(|| FieldError::Missing(CPU_ID_FIELD.to_string()))
    }
}

/// A source of events in capture order
///
/// Loaders implement this to expose the event count (for progress) and the
/// set of distinct event names (for the coverage check).
pub trait EventSource {
    /// Events in capture order
    fn events(&self) -> &[Event];

    /// Total number of events
    fn event_count(&self) -> usize {
        self.events().len()
    }

    /// Distinct event names present in the stream
    fn event_names(&self) -> BTreeSet<String> {
        self.events().iter().map(|e| e.name.clone()).collect()
    }
}

impl EventSource for [Event] {
    fn events(&self) -> &[Event] {
        self
    }
}

impl EventSource for Vec<Event> {
    fn events(&self) -> &[Event] {
        self
    }
}
