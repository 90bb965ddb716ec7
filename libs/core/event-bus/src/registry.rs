//! Event type → ordered handler list.
//!
//! Lists are stored as immutable `Arc<[Handler]>` slices and replaced
//! wholesale on every mutation. A dispatch works on the slice it cloned at the
//! start, so concurrent `subscribe`/`unsubscribe` calls never change what an
//! in-flight `publish` iterates. The lock is only held for the map lookup or
//! swap, never across an await.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{EventBusError, EventBusResult};
use crate::handler::Handler;

type HandlerList = Arc<[Handler]>;

#[derive(Debug, Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, HandlerList>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the list for `event_type` and return the new
    /// handler count for that type. The same handler may be added twice and
    /// will then be invoked twice.
    pub fn subscribe(&self, event_type: &str, handler: Handler) -> EventBusResult<usize> {
        if event_type.trim().is_empty() {
            return Err(EventBusError::InvalidArgument(
                "event type must not be empty".to_string(),
            ));
        }

        let mut handlers = self.write();
        let updated: HandlerList = match handlers.get(event_type) {
            Some(existing) => existing.iter().cloned().chain([handler]).collect(),
            None => Arc::from(vec![handler]),
        };
        let count = updated.len();
        handlers.insert(event_type.to_string(), updated);
        Ok(count)
    }

    /// Remove the first reference to `handler`, or every handler when `None`.
    ///
    /// Unknown event types are a no-op. Returns how many handlers were removed.
    pub fn unsubscribe(&self, event_type: &str, handler: Option<&Handler>) -> usize {
        let mut handlers = self.write();

        let Some(handler) = handler else {
            return handlers.remove(event_type).map_or(0, |list| list.len());
        };

        let Some(existing) = handlers.get(event_type) else {
            return 0;
        };
        let Some(position) = existing.iter().position(|h| h.same_as(handler)) else {
            return 0;
        };

        if existing.len() == 1 {
            handlers.remove(event_type);
        } else {
            let remaining: HandlerList = existing
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != position)
                .map(|(_, h)| h.clone())
                .collect();
            handlers.insert(event_type.to_string(), remaining);
        }
        1
    }

    /// Handlers registered for `event_type` at this instant, in subscription order.
    pub fn snapshot(&self, event_type: &str) -> Option<HandlerList> {
        self.read().get(event_type).cloned()
    }

    /// Drop every subscription. Returns the number of event types cleared.
    pub fn clear(&self) -> usize {
        let mut handlers = self.write();
        let cleared = handlers.len();
        handlers.clear();
        cleared
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.read().get(event_type).map_or(0, |list| list.len())
    }

    /// Event types with at least one handler, sorted.
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave the map half-updated: every
    // mutation is a single insert/remove.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, HandlerList>> {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, HandlerList>> {
        self.handlers.write().unwrap_or_else(PoisonError::into_inner)
    }
}
