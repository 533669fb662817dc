//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.
//!
//! Data-quality problems (dangling references, unmatched start/end pairs) are
//! not errors: they are recorded on the affected rows as
//! [`Anomaly`](crate::data_model::Anomaly) values.

use thiserror::Error;

/// Errors that abort a processing pass
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Invalid processor configuration: {0}")]
    Configuration(String),

    #[error("Required event '{event}' not found in trace (required by: {})", handlers.join(", "))]
    RequiredEventNotFound {
        event: String,
        handlers: Vec<String>,
    },

    #[error("Malformed event '{event}' at {timestamp}: {source}")]
    InvalidEvent {
        event: String,
        timestamp: u64,
        #[source]
        source: FieldError,
    },

    #[error("Handler '{0}' received an event after its data model was finalized")]
    AlreadyFinalized(String),
}

/// Errors that can occur while reading a field out of an event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("missing field '{0}'")]
    Missing(String),

    #[error("field '{field}' is not a valid {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
}

impl FieldError {
    /// Attach event context, producing a fatal processing error
    pub fn in_event(self, event: &str, timestamp: u64) -> ProcessError {
        ProcessError::InvalidEvent {
            event: event.to_string(),
            timestamp,
            source: self,
        }
    }
}

/// Errors that can occur while loading a converted event file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read event file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid event on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur while loading the analysis configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid symbol address '{0}'")]
    InvalidAddress(String),
}

/// Errors that can occur while rendering a report
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write report: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
