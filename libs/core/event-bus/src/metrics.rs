//! Prometheus metrics for event dispatch.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct EventBusMetrics;

impl EventBusMetrics {
    /// Record one `publish` call and how long dispatch took.
    pub fn published(&self, event_type: &str, duration: Duration) {
        counter!(
            "events_published_total",
            "event_type" => event_type.to_string()
        )
        .increment(1);

        histogram!(
            "event_publish_duration_seconds",
            "event_type" => event_type.to_string()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a handler returning an error or panicking.
    pub fn handler_failed(&self, event_type: &str) {
        counter!(
            "event_handler_failures_total",
            "event_type" => event_type.to_string()
        )
        .increment(1);
    }

    /// Update the subscriber gauge for one event type.
    pub fn subscribers(&self, event_type: &str, count: usize) {
        gauge!(
            "event_subscribers",
            "event_type" => event_type.to_string()
        )
        .set(count as f64);
    }
}
