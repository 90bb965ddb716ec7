//! Event bus test doubles

use async_trait::async_trait;
use event_bus::{EventContext, EventEnvelope, EventHandler, Handler, HandlerResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Handler that remembers every event it receives
///
/// Optionally sleeps before returning and/or fails every call, so tests can
/// check isolation and concurrency without writing one-off handler types.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::new("audit");
/// bus.subscribe("TaskCreated", recorder.handler())?;
///
/// bus.publish(&ctx, &event).await;
/// assert_eq!(recorder.event_ids(), vec!["evt-1"]);
/// ```
#[derive(Clone)]
pub struct RecordingHandler {
    inner: Arc<Recorder>,
    handler: Handler,
}

struct Recorder {
    name: String,
    delay: Option<Duration>,
    failure: Option<String>,
    received: Mutex<Vec<(EventContext, EventEnvelope)>>,
}

impl RecordingHandler {
    /// Create a handler that always succeeds
    pub fn new(name: &str) -> Self {
        Self::build(name, None, None)
    }

    /// Create a handler that records the event, then returns `message` as an error
    pub fn failing(name: &str, message: &str) -> Self {
        Self::build(name, None, Some(message.to_string()))
    }

    /// Create a handler that sleeps for `delay` before recording
    pub fn slow(name: &str, delay: Duration) -> Self {
        Self::build(name, Some(delay), None)
    }

    fn build(name: &str, delay: Option<Duration>, failure: Option<String>) -> Self {
        let inner = Arc::new(Recorder {
            name: name.to_string(),
            delay,
            failure,
            received: Mutex::new(Vec::new()),
        });
        // Every call to `handler()` hands out the same registration identity
        let handler = Handler::from_arc(inner.clone());
        Self { inner, handler }
    }

    /// The `Handler` to subscribe. Clones unsubscribe as the same handler.
    pub fn handler(&self) -> Handler {
        self.handler.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    pub fn events(&self) -> Vec<EventEnvelope> {
        self.lock().iter().map(|(_, event)| event.clone()).collect()
    }

    pub fn contexts(&self) -> Vec<EventContext> {
        self.lock().iter().map(|(ctx, _)| ctx.clone()).collect()
    }

    pub fn event_ids(&self) -> Vec<String> {
        self.lock()
            .iter()
            .map(|(_, event)| event.id().to_string())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(EventContext, EventEnvelope)>> {
        self.inner
            .received
            .lock()
            .expect("recording handler mutex poisoned")
    }
}

#[async_trait]
impl EventHandler for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, context: &EventContext, event: &EventEnvelope) -> HandlerResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.received
            .lock()
            .expect("recording handler mutex poisoned")
            .push((context.clone(), event.clone()));

        match &self.failure {
            Some(message) => Err(message.clone().into()),
            None => Ok(()),
        }
    }
}
