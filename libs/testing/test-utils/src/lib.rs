//! Shared test utilities
//!
//! This crate provides reusable test infrastructure for the workspace crates:
//! - `TestDatabase`: PostgreSQL container with automatic cleanup (feature: "postgres")
//! - `RecordingHandler`: event handler that records what it receives (feature: "events")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//!
//! # Features
//!
//! - `postgres` (default): Enables PostgreSQL test infrastructure
//! - `events`: Enables event bus test doubles
//! - `all`: Enables everything
//!
//! # Usage
//!
//! ## PostgreSQL Testing
//!
//! ```rust,no_run
//! use test_utils::TestDatabase;
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_postgres_test() {
//!     let db = TestDatabase::new().await;
//!     db.execute("CREATE TABLE accounts (id INT PRIMARY KEY, balance INT NOT NULL)").await;
//! }
//! ```
//!
//! ## Event Bus Testing
//!
//! Add `features = ["events"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["events"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::{RecordingHandler, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_event_test() {
//!     let builder = TestDataBuilder::from_test_name("my_event_test");
//!     let recorder = RecordingHandler::new("audit");
//!     bus.subscribe("TaskCreated", recorder.handler()).unwrap();
//!
//!     let event = EventEnvelope::new("TaskCreated", "tasks", json!({}))
//!         .with_id(builder.event_id("first"));
//!     bus.publish(&EventContext::new(), &event).await;
//!
//!     assert_eq!(recorder.call_count(), 1);
//! }
//! ```

use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "events")]
mod events;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

#[cfg(feature = "events")]
pub use events::RecordingHandler;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_publish_fan_out");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a user ID usable as an event actor
    pub fn user_id(&self) -> Uuid {
        let bytes = self.seed.to_le_bytes();
        let mut uuid_bytes = [0u8; 16];
        uuid_bytes[..8].copy_from_slice(&bytes);
        uuid_bytes[8..16].copy_from_slice(&bytes);
        Uuid::from_bytes(uuid_bytes)
    }

    /// Generate an event id unique to this test
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.event_id("first"), "evt-7-first");
    /// ```
    pub fn event_id(&self, suffix: &str) -> String {
        format!("evt-{}-{}", self.seed, suffix)
    }
}
