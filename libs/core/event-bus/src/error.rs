//! Error types for the event bus.

use thiserror::Error;

/// Errors surfaced to callers of the bus.
///
/// Handler failures are never reported here: `publish` contains them.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Caller bug, e.g. subscribing to an empty event type.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Payload could not be converted to or from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EventBusResult<T> = Result<T, EventBusError>;
