//! Subscriber callbacks.
//!
//! A [`Handler`] is a cheap, cloneable reference to either a synchronous
//! function or an [`EventHandler`] implementation. Both are driven through
//! [`Handler::invoke`], which always yields a future, so the dispatcher never
//! needs to know which kind it is calling.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::context::EventContext;
use crate::envelope::EventEnvelope;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

pub type HandlerResult = Result<(), HandlerError>;

/// Asynchronous subscriber.
///
/// # Example
///
/// ```rust,ignore
/// struct TaskCountProjection { counts: Arc<RwLock<HashMap<String, u64>>> }
///
/// #[async_trait]
/// impl EventHandler for TaskCountProjection {
///     fn name(&self) -> &str { "task_count_projection" }
///
///     async fn handle(&self, _ctx: &EventContext, event: &EventEnvelope) -> HandlerResult {
///         let created: TaskCreated = event.payload_as()?;
///         *self.counts.write().await.entry(created.project_id).or_default() += 1;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs when this handler fails.
    fn name(&self) -> &str;

    async fn handle(&self, context: &EventContext, event: &EventEnvelope) -> HandlerResult;
}

type SyncFn = dyn Fn(&EventContext, &EventEnvelope) -> HandlerResult + Send + Sync;

#[derive(Clone)]
enum Callable {
    Sync(Arc<SyncFn>),
    Async(Arc<dyn EventHandler>),
}

/// Which adapter a [`Handler`] goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Sync,
    Async,
}

/// A subscribed callback.
///
/// Clones share the underlying callable and count as the same handler for
/// [`unsubscribe`](crate::EventBus::unsubscribe). Two handlers built from
/// separate constructor calls are different even if they wrap the same
/// function.
#[derive(Clone)]
pub struct Handler {
    name: Arc<str>,
    callable: Callable,
}

impl Handler {
    /// Wrap a synchronous function. It runs to completion when invoked.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&EventContext, &EventEnvelope) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(std::any::type_name::<F>()),
            callable: Callable::Sync(Arc::new(f)),
        }
    }

    /// Wrap an async function. It receives owned copies of the context and
    /// envelope so the returned future can be `'static`.
    pub fn from_async_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(EventContext, EventEnvelope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let name: Arc<str> = Arc::from(std::any::type_name::<F>());
        Self {
            name: name.clone(),
            callable: Callable::Async(Arc::new(AsyncFnHandler { name, f })),
        }
    }

    pub fn new<H: EventHandler + 'static>(handler: H) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    pub fn from_arc(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            name: Arc::from(handler.name()),
            callable: Callable::Async(handler),
        }
    }

    /// Override the name reported in logs.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Arc::from(name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> HandlerKind {
        match self.callable {
            Callable::Sync(_) => HandlerKind::Sync,
            Callable::Async(_) => HandlerKind::Async,
        }
    }

    /// Whether `self` and `other` refer to the same callable.
    pub fn same_as(&self, other: &Handler) -> bool {
        match (&self.callable, &other.callable) {
            (Callable::Sync(a), Callable::Sync(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Callable::Async(a), Callable::Async(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }

    /// Run the handler. Synchronous handlers execute on first poll.
    pub fn invoke<'a>(
        &'a self,
        context: &'a EventContext,
        event: &'a EventEnvelope,
    ) -> BoxFuture<'a, HandlerResult> {
        match &self.callable {
            Callable::Sync(f) => Box::pin(async move { f(context, event) }),
            Callable::Async(handler) => handler.handle(context, event),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

impl<H: EventHandler + 'static> From<Arc<H>> for Handler {
    fn from(handler: Arc<H>) -> Self {
        Self::from_arc(handler)
    }
}

struct AsyncFnHandler<F> {
    name: Arc<str>,
    f: F,
}

#[async_trait]
impl<F, Fut> EventHandler for AsyncFnHandler<F>
where
    F: Fn(EventContext, EventEnvelope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, context: &EventContext, event: &EventEnvelope) -> HandlerResult {
        (self.f)(context.clone(), event.clone()).await
    }
}
