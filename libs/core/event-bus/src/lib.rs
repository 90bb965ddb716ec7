//! In-process event bus for cross-domain communication.
//!
//! Domains publish [`EventEnvelope`]s by type; any number of handlers,
//! synchronous or asynchronous, subscribe to a type and are invoked
//! concurrently on every publish. A failing or panicking handler never
//! affects the publisher or the other handlers.
//!
//! ```rust,ignore
//! let bus = Arc::new(EventBus::new());
//!
//! bus.subscribe("TaskCreated", Handler::new(TaskCountProjection::new(counts)))?;
//! bus.subscribe("TaskCreated", Handler::sync(|_ctx, event| {
//!     tracing::info!(task_id = %event.payload()["taskId"], "task created");
//!     Ok(())
//! }))?;
//!
//! let event = EventEnvelope::from_data("TaskCreated", "tasks", &created)?;
//! bus.publish(&EventContext::new().with_actor_id(user_id), &event).await;
//! ```
//!
//! Delivery is best effort and in-process only: nothing is persisted, and
//! there is no retry or ordering guarantee between handlers.

pub mod bus;
pub mod context;
pub mod envelope;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod registry;

pub use bus::{EventBus, PublishReport};
pub use context::EventContext;
pub use envelope::EventEnvelope;
pub use error::{EventBusError, EventBusResult};
pub use handler::{EventHandler, Handler, HandlerError, HandlerKind, HandlerResult};
pub use metrics::EventBusMetrics;
pub use registry::HandlerRegistry;
