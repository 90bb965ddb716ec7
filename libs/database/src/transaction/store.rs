use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::warn;

use super::classifier::TransactionFailure;

/// A data store that can run work inside a transaction.
///
/// Locking and isolation of the actual data mutation are entirely the
/// store's business; the executor only begins, commits and rolls back.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Handle passed to the unit of work for the lifetime of one attempt.
    type Transaction: Send + Sync;

    /// Error raised by begin/commit/rollback.
    type Error: TransactionFailure + Send;

    async fn begin(&self) -> Result<Self::Transaction, Self::Error>;

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), Self::Error>;

    async fn rollback(&self, transaction: Self::Transaction) -> Result<(), Self::Error>;
}

/// Begin a transaction, run `unit_of_work`, then commit on `Ok` or roll back
/// on `Err`.
///
/// The unit-of-work error is returned unchanged. A failing rollback is
/// logged but never replaces it.
pub async fn run_in_transaction<S, T, E, F>(store: &S, unit_of_work: &F) -> Result<T, E>
where
    S: TransactionStore + ?Sized,
    E: From<S::Error>,
    F: for<'c> Fn(&'c S::Transaction) -> BoxFuture<'c, Result<T, E>> + ?Sized,
{
    let transaction = store.begin().await?;

    match unit_of_work(&transaction).await {
        Ok(value) => {
            store.commit(transaction).await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = store.rollback(transaction).await {
                warn!(error = %rollback_error, "Rollback failed after unit of work error");
            }
            Err(error)
        }
    }
}
