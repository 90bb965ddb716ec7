//! Immutable record of one published domain event.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{EventBusError, EventBusResult};

/// A domain event as seen by subscribers.
///
/// Fields are private: once the envelope is handed to `publish` every handler
/// sees the same values. Identity is [`id`](Self::id); the bus does not check
/// uniqueness, that is the publisher's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    id: String,
    source: String,
    payload: Value,
    occurred_at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Create an envelope with a fresh time-ordered id and the current time.
    ///
    /// # Example
    /// ```
    /// use event_bus::EventEnvelope;
    /// use serde_json::json;
    ///
    /// let event = EventEnvelope::new("TaskCreated", "tasks", json!({ "taskId": "t1" }))
    ///     .with_id("evt-1");
    /// assert_eq!(event.event_type(), "TaskCreated");
    /// assert_eq!(event.id(), "evt-1");
    /// ```
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            id: Uuid::now_v7().to_string(),
            source: source.into(),
            payload,
            occurred_at: Utc::now(),
        }
    }

    /// Serialize `data` as the payload.
    pub fn from_data<T: Serialize>(
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: &T,
    ) -> EventBusResult<Self> {
        Ok(Self::new(event_type, source, serde_json::to_value(data)?))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Deserialize the payload into a typed event body.
    pub fn payload_as<T: DeserializeOwned>(&self) -> EventBusResult<T> {
        serde_json::from_value(self.payload.clone()).map_err(EventBusError::from)
    }
}
