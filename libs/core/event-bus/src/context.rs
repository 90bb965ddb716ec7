use std::collections::BTreeMap;

/// Request-scoped data passed to every handler alongside the envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventContext {
    /// Correlation id of the request that caused the event.
    pub request_id: Option<String>,

    /// User or service on whose behalf the event was published.
    pub actor_id: Option<String>,

    pub metadata: BTreeMap<String, String>,
}

impl EventContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}
