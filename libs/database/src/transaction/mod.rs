//! Transactional execution engine.
//!
//! Domain services run their reads and writes through [`with_transaction`]:
//! the unit of work gets a transaction handle, conflicts (serialization
//! failures, deadlocks) are retried with linear backoff, every attempt is
//! bounded by a deadline, and any other error is returned unchanged on the
//! first occurrence.
//!
//! ```text
//! attempt 0 ──fail(retryable)──▶ sleep(base*1) ──▶ attempt 1 ──fail──▶ sleep(base*2) ──▶ …
//!     │                                               │
//!     └─ ok ─▶ commit, return                         └─ fatal / timeout / exhausted ─▶ Err(last error)
//! ```
//!
//! Nothing here is durable: a crash mid-retry loses the in-flight call.

mod backoff;
mod classifier;
mod executor;
mod memory;
mod metrics;
mod options;
mod store;

pub use backoff::BackoffPolicy;
pub use classifier::{
    ErrorClass, ErrorClassifier, PostgresErrorClassifier, RETRYABLE_CONDITION_CODES,
    RETRYABLE_MESSAGE_FRAGMENTS, TransactionFailure, classify,
};
pub use executor::{
    TransactionError, TransactionExecutor, with_read_only_transaction, with_transaction,
};
pub use memory::{InMemoryStore, InMemoryTransaction, StoreStats};
pub use metrics::{FailureReason, TransactionMetrics};
pub use options::TransactionOptions;
pub use store::{TransactionStore, run_in_transaction};
