//! Counters for the transaction retry loop.
//!
//! Without an installed `metrics` recorder every call is a no-op.

use metrics::{counter, histogram};
use std::time::Duration;

/// Why a transaction call ended in an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    Fatal,
    Exhausted,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::Fatal => "fatal",
            FailureReason::Exhausted => "exhausted",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionMetrics;

impl TransactionMetrics {
    pub fn attempt_started(&self) {
        counter!("transaction_attempts_total").increment(1);
    }

    pub fn retry_scheduled(&self) {
        counter!("transaction_retries_total").increment(1);
    }

    pub fn failed(&self, reason: FailureReason) {
        counter!("transaction_failures_total", "reason" => reason.as_str()).increment(1);
    }

    pub fn finished(&self, duration: Duration, success: bool) {
        histogram!(
            "transaction_duration_seconds",
            "status" => if success { "success" } else { "error" }
        )
        .record(duration.as_secs_f64());
    }
}
