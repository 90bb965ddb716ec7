use std::time::Duration;

#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_parse};

use super::backoff::BackoffPolicy;

/// Per-call settings for [`with_transaction`](super::with_transaction).
///
/// Values are passed by value on every call; nothing global is mutated.
/// The default is a single attempt with a 30 second deadline, so call sites
/// that never opt in to retries keep single-attempt semantics.
///
/// # Example
/// ```
/// use database::transaction::TransactionOptions;
///
/// let options = TransactionOptions::new()
///     .with_max_retries(3)
///     .with_timeout_ms(5_000)
///     .with_retry_base_delay_ms(50);
///
/// assert_eq!(options.total_attempts(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Retries after the first attempt. `0` means exactly one attempt.
    pub max_retries: u32,

    /// Deadline for a single attempt.
    pub timeout: Duration,

    /// Base of the linear backoff: retry `n` (1-based) waits `n * retry_base_delay`.
    pub retry_base_delay: Duration,
}

impl TransactionOptions {
    pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
    pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 100;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_ms(self, timeout_ms: u64) -> Self {
        self.with_timeout(Duration::from_millis(timeout_ms))
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_retry_base_delay_ms(self, delay_ms: u64) -> Self {
        self.with_retry_base_delay(Duration::from_millis(delay_ms))
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::linear(self.retry_base_delay)
    }
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            max_retries: 0,
            timeout: Duration::from_millis(Self::DEFAULT_TIMEOUT_MS),
            retry_base_delay: Duration::from_millis(Self::DEFAULT_RETRY_BASE_DELAY_MS),
        }
    }
}

/// Load service-wide transaction defaults from the environment.
///
/// - `TX_MAX_RETRIES` (optional, default: 0)
/// - `TX_TIMEOUT_MS` (optional, default: 30000)
/// - `TX_RETRY_BASE_DELAY_MS` (optional, default: 100)
#[cfg(feature = "config")]
impl FromEnv for TransactionOptions {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_retries: env_parse("TX_MAX_RETRIES", 0)?,
            timeout: Duration::from_millis(env_parse(
                "TX_TIMEOUT_MS",
                Self::DEFAULT_TIMEOUT_MS,
            )?),
            retry_base_delay: Duration::from_millis(env_parse(
                "TX_RETRY_BASE_DELAY_MS",
                Self::DEFAULT_RETRY_BASE_DELAY_MS,
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_single_attempt() {
        let options = TransactionOptions::default();
        assert_eq!(options.max_retries, 0);
        assert_eq!(options.total_attempts(), 1);
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.retry_base_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_builder_leaves_original_untouched() {
        let base = TransactionOptions::new();
        let tuned = base.with_max_retries(2).with_timeout_ms(500);

        assert_eq!(base, TransactionOptions::default());
        assert_eq!(tuned.max_retries, 2);
        assert_eq!(tuned.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_backoff_is_linear_in_base_delay() {
        let options = TransactionOptions::new().with_retry_base_delay_ms(40);
        assert_eq!(options.backoff().delay(0), Duration::from_millis(40));
        assert_eq!(options.backoff().delay(2), Duration::from_millis(120));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars_unset(
            ["TX_MAX_RETRIES", "TX_TIMEOUT_MS", "TX_RETRY_BASE_DELAY_MS"],
            || {
                let options = TransactionOptions::from_env().unwrap();
                assert_eq!(options, TransactionOptions::default());
            },
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("TX_MAX_RETRIES", Some("3")),
                ("TX_TIMEOUT_MS", Some("1500")),
                ("TX_RETRY_BASE_DELAY_MS", Some("25")),
            ],
            || {
                let options = TransactionOptions::from_env().unwrap();
                assert_eq!(options.max_retries, 3);
                assert_eq!(options.timeout, Duration::from_millis(1500));
                assert_eq!(options.retry_base_delay, Duration::from_millis(25));
            },
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_env_rejects_negative_retries() {
        temp_env::with_var("TX_MAX_RETRIES", Some("-1"), || {
            let err = TransactionOptions::from_env().unwrap_err();
            assert!(err.to_string().contains("TX_MAX_RETRIES"));
        });
    }
}
