//! The dispatcher.

use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::context::EventContext;
use crate::envelope::EventEnvelope;
use crate::error::EventBusResult;
use crate::handler::Handler;
use crate::metrics::EventBusMetrics;
use crate::registry::HandlerRegistry;

/// Outcome of one [`EventBus::publish`] call.
///
/// Informational only. Handler failures have already been logged by the time
/// the caller sees this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub event_type: String,
    pub event_id: String,
    /// Handlers invoked.
    pub handlers: usize,
    /// Handlers that returned an error or panicked.
    pub failed: usize,
}

impl PublishReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// In-process publish/subscribe bus.
///
/// Construct one per application and share it (`Arc<EventBus>`) with the
/// services that publish and the modules that subscribe.
///
/// `publish` never fails: each handler runs in isolation, and an error or panic
/// in one is logged and counted without affecting the others or the
/// publisher.
///
/// # Example
///
/// ```
/// use event_bus::{EventBus, EventContext, EventEnvelope, Handler};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let bus = EventBus::new();
/// bus.subscribe("TaskCreated", Handler::sync(|_ctx, event| {
///     assert_eq!(event.payload()["taskId"], "t1");
///     Ok(())
/// }))
/// .unwrap();
///
/// let event = EventEnvelope::new("TaskCreated", "tasks", json!({ "taskId": "t1" }));
/// let report = bus.publish(&EventContext::new(), &event).await;
/// assert_eq!(report.handlers, 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct EventBus {
    registry: HandlerRegistry,
    closed: AtomicBool,
    metrics: EventBusMetrics,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event_type`.
    ///
    /// Fails only when `event_type` is blank. Subscribing to a closed bus
    /// reopens it.
    pub fn subscribe(&self, event_type: &str, handler: Handler) -> EventBusResult<()> {
        let handler_name = handler.name().to_string();
        let count = self.registry.subscribe(event_type, handler)?;
        self.closed.store(false, Ordering::Release);
        self.metrics.subscribers(event_type, count);

        debug!(
            event_type = %event_type,
            handler = %handler_name,
            handler_count = count,
            "Handler subscribed"
        );
        Ok(())
    }

    /// Remove the first registration of `handler`, or all handlers for the
    /// type when `None`. Unknown types and handlers are ignored.
    pub fn unsubscribe(&self, event_type: &str, handler: Option<&Handler>) {
        let removed = self.registry.unsubscribe(event_type, handler);
        if removed > 0 {
            let remaining = self.registry.handler_count(event_type);
            self.metrics.subscribers(event_type, remaining);
            debug!(
                event_type = %event_type,
                removed,
                handler_count = remaining,
                "Handler unsubscribed"
            );
        }
    }

    /// Deliver `event` to every handler subscribed to its type.
    ///
    /// Handlers start in subscription order and run concurrently; this returns
    /// once all of them have settled. The handler set is fixed when the call
    /// starts, so subscriptions made while it runs apply to the next publish.
    #[instrument(
        name = "publish",
        skip_all,
        fields(event_type = %event.event_type(), event_id = %event.id())
    )]
    pub async fn publish(&self, context: &EventContext, event: &EventEnvelope) -> PublishReport {
        let started = Instant::now();
        let mut report = PublishReport {
            event_type: event.event_type().to_string(),
            event_id: event.id().to_string(),
            handlers: 0,
            failed: 0,
        };

        let Some(handlers) = self.registry.snapshot(event.event_type()) else {
            debug!("No handlers subscribed");
            self.metrics.published(event.event_type(), started.elapsed());
            return report;
        };
        report.handlers = handlers.len();

        let runs = handlers.iter().map(move |handler| {
            AssertUnwindSafe(async move { handler.invoke(context, event).await }).catch_unwind()
        });
        let outcomes = join_all(runs).await;

        for (index, (handler, outcome)) in handlers.iter().zip(outcomes).enumerate() {
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(panic) => format!("handler panicked: {}", panic_message(&*panic)),
            };

            report.failed += 1;
            self.metrics.handler_failed(event.event_type());
            error!(
                event_type = %event.event_type(),
                event_id = %event.id(),
                handler_index = index,
                handler = %handler.name(),
                error = %message,
                "Event handler failed"
            );
        }

        if report.failed > 0 {
            warn!(
                handlers = report.handlers,
                failed = report.failed,
                "Some event handlers failed"
            );
        }

        self.metrics.published(event.event_type(), started.elapsed());
        report
    }

    /// Drop every subscription. Calling it again is a no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let cleared = self.registry.clear();
        info!(event_types = cleared, "Event bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.registry.handler_count(event_type)
    }

    /// Event types with at least one handler, sorted.
    pub fn event_types(&self) -> Vec<String> {
        self.registry.event_types()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
