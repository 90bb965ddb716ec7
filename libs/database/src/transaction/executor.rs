use futures::future::BoxFuture;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use super::classifier::{ErrorClassifier, PostgresErrorClassifier, TransactionFailure};
use super::metrics::{FailureReason, TransactionMetrics};
use super::options::TransactionOptions;
use super::store::{TransactionStore, run_in_transaction};

/// Error returned by [`with_transaction`].
///
/// `Failed` carries the last attempt's error exactly as the unit of work (or
/// the store) produced it, so callers can still match on store-specific
/// variants after retries are exhausted.
#[derive(Debug, Error)]
pub enum TransactionError<E> {
    /// The attempt did not finish within [`TransactionOptions::timeout`].
    /// Never retried.
    #[error("transaction attempt {attempt} timed out after {timeout:?}")]
    Timeout { timeout: Duration, attempt: u32 },

    #[error(transparent)]
    Failed(E),
}

impl<E> TransactionError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransactionError::Timeout { .. })
    }

    pub fn inner(&self) -> Option<&E> {
        match self {
            TransactionError::Failed(error) => Some(error),
            TransactionError::Timeout { .. } => None,
        }
    }

    pub fn into_inner(self) -> Option<E> {
        match self {
            TransactionError::Failed(error) => Some(error),
            TransactionError::Timeout { .. } => None,
        }
    }
}

/// Result of one attempt, transient to a single `execute` call.
#[derive(Debug)]
enum AttemptOutcome<T, E> {
    Success(T),
    Failure {
        error: TransactionError<E>,
        retryable: bool,
    },
}

/// Runs units of work in store transactions with a deadline, classified
/// retry and linear backoff.
///
/// Holds no state between calls apart from its classifier.
///
/// # Timeouts
///
/// The deadline races the whole attempt (begin, unit of work, commit). When it
/// fires, the attempt future is dropped: the unit of work stops at its next
/// await point and the uncommitted transaction handle is dropped, which the
/// store rolls back. Work the unit of work detached with `tokio::spawn` keeps
/// running and may still touch the store after the caller has seen
/// [`TransactionError::Timeout`]. A commit already in flight when the deadline
/// fires may or may not have been applied.
#[derive(Debug, Clone, Default)]
pub struct TransactionExecutor<C = PostgresErrorClassifier> {
    classifier: C,
    metrics: TransactionMetrics,
}

impl TransactionExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: ErrorClassifier> TransactionExecutor<C> {
    pub fn with_classifier(classifier: C) -> Self {
        Self {
            classifier,
            metrics: TransactionMetrics,
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Run `unit_of_work` in a transaction, retrying conflicts.
    ///
    /// Makes at most `options.max_retries + 1` strictly sequential attempts.
    /// The unit of work is re-executed from scratch on every retry, so it must
    /// not have side effects outside the transaction.
    #[instrument(
        name = "transaction",
        skip_all,
        fields(
            max_retries = options.max_retries,
            timeout_ms = options.timeout.as_millis() as u64
        )
    )]
    pub async fn execute<S, T, E, F>(
        &self,
        store: &S,
        unit_of_work: F,
        options: TransactionOptions,
    ) -> Result<T, TransactionError<E>>
    where
        S: TransactionStore + ?Sized,
        E: TransactionFailure + From<S::Error>,
        F: for<'c> Fn(&'c S::Transaction) -> BoxFuture<'c, Result<T, E>> + Send + Sync,
    {
        let started = Instant::now();
        let backoff = options.backoff();
        let mut attempt: u32 = 0;

        loop {
            match self
                .attempt(store, &unit_of_work, options.timeout, attempt)
                .await
            {
                AttemptOutcome::Success(value) => {
                    if attempt > 0 {
                        info!(attempt, "Transaction succeeded after retry");
                    }
                    self.metrics.finished(started.elapsed(), true);
                    return Ok(value);
                }
                AttemptOutcome::Failure { error, retryable } => {
                    if retryable && attempt < options.max_retries {
                        let delay = backoff.delay(attempt);
                        warn!(
                            attempt,
                            max_retries = options.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Retryable transaction error, retrying"
                        );
                        self.metrics.retry_scheduled();
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    let reason = if error.is_timeout() {
                        warn!(attempt, error = %error, "Transaction timed out");
                        FailureReason::Timeout
                    } else if retryable {
                        error!(
                            attempts = attempt + 1,
                            error = %error,
                            "Transaction failed after all retries"
                        );
                        FailureReason::Exhausted
                    } else {
                        debug!(attempt, error = %error, "Transaction failed with non-retryable error");
                        FailureReason::Fatal
                    };
                    self.metrics.failed(reason);
                    self.metrics.finished(started.elapsed(), false);
                    return Err(error);
                }
            }
        }
    }

    /// Run `unit_of_work` in a single transaction without deadline or retry.
    ///
    /// For call sites that only need a consistent read view.
    #[instrument(name = "read_only_transaction", skip_all)]
    pub async fn execute_read_only<S, T, E, F>(&self, store: &S, unit_of_work: F) -> Result<T, E>
    where
        S: TransactionStore + ?Sized,
        E: TransactionFailure + From<S::Error>,
        F: for<'c> Fn(&'c S::Transaction) -> BoxFuture<'c, Result<T, E>> + Send + Sync,
    {
        self.metrics.attempt_started();
        let result = run_in_transaction(store, &unit_of_work).await;
        if let Err(error) = &result {
            debug!(error = %error, "Read-only transaction failed");
        }
        result
    }

    #[instrument(name = "transaction_attempt", skip_all, fields(attempt = attempt))]
    async fn attempt<S, T, E, F>(
        &self,
        store: &S,
        unit_of_work: &F,
        timeout: Duration,
        attempt: u32,
    ) -> AttemptOutcome<T, E>
    where
        S: TransactionStore + ?Sized,
        E: TransactionFailure + From<S::Error>,
        F: for<'c> Fn(&'c S::Transaction) -> BoxFuture<'c, Result<T, E>> + Send + Sync,
    {
        self.metrics.attempt_started();
        debug!("Starting transaction attempt");

        match tokio::time::timeout(timeout, run_in_transaction(store, unit_of_work)).await {
            Ok(Ok(value)) => AttemptOutcome::Success(value),
            Ok(Err(error)) => {
                let retryable = self.classifier.classify_error(&error).is_retryable();
                AttemptOutcome::Failure {
                    error: TransactionError::Failed(error),
                    retryable,
                }
            }
            Err(_) => AttemptOutcome::Failure {
                error: TransactionError::Timeout { timeout, attempt },
                retryable: false,
            },
        }
    }
}

/// Run `unit_of_work` in a transaction on `store` with the default
/// PostgreSQL error classification.
///
/// # Example
/// ```ignore
/// use database::transaction::{with_transaction, TransactionOptions};
/// use database::DatabaseError;
///
/// let task_id = with_transaction(
///     &db,
///     |txn| Box::pin(async move {
///         let task = tasks::ActiveModel { /* ... */ }.insert(txn).await?;
///         Ok::<_, DatabaseError>(task.id)
///     }),
///     TransactionOptions::new().with_max_retries(3),
/// )
/// .await?;
/// ```
pub async fn with_transaction<S, T, E, F>(
    store: &S,
    unit_of_work: F,
    options: TransactionOptions,
) -> Result<T, TransactionError<E>>
where
    S: TransactionStore + ?Sized,
    E: TransactionFailure + From<S::Error>,
    F: for<'c> Fn(&'c S::Transaction) -> BoxFuture<'c, Result<T, E>> + Send + Sync,
{
    TransactionExecutor::new()
        .execute(store, unit_of_work, options)
        .await
}

/// Run `unit_of_work` in one transaction: no retry, no deadline.
pub async fn with_read_only_transaction<S, T, E, F>(store: &S, unit_of_work: F) -> Result<T, E>
where
    S: TransactionStore + ?Sized,
    E: TransactionFailure + From<S::Error>,
    F: for<'c> Fn(&'c S::Transaction) -> BoxFuture<'c, Result<T, E>> + Send + Sync,
{
    TransactionExecutor::new()
        .execute_read_only(store, unit_of_work)
        .await
}
