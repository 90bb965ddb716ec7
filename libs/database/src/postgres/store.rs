//! SeaORM bindings for the transaction engine.

use async_trait::async_trait;
use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel, RuntimeErr,
    TransactionTrait,
};
use std::borrow::Cow;

use crate::transaction::{TransactionFailure, TransactionStore};

/// Exposes the SQLSTATE of database errors raised by sqlx.
impl TransactionFailure for DbErr {
    fn condition_code(&self) -> Option<Cow<'_, str>> {
        match self {
            DbErr::Exec(RuntimeErr::SqlxError(err)) | DbErr::Query(RuntimeErr::SqlxError(err)) => {
                err.as_database_error().and_then(|db_err| db_err.code())
            }
            _ => None,
        }
    }
}

/// Transactions with the server's default isolation level.
#[async_trait]
impl TransactionStore for DatabaseConnection {
    type Transaction = DatabaseTransaction;
    type Error = DbErr;

    async fn begin(&self) -> Result<Self::Transaction, Self::Error> {
        TransactionTrait::begin(self).await
    }

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), Self::Error> {
        transaction.commit().await
    }

    async fn rollback(&self, transaction: Self::Transaction) -> Result<(), Self::Error> {
        transaction.rollback().await
    }
}

/// A connection whose transactions begin with an explicit isolation level
/// and access mode.
///
/// Under `SERIALIZABLE`, conflicting transactions fail with SQLSTATE `40001`,
/// which the executor retries.
///
/// ```ignore
/// use database::postgres::IsolatedStore;
/// use database::transaction::{with_transaction, TransactionOptions};
///
/// let store = IsolatedStore::serializable(db.clone());
/// with_transaction(&store, |txn| Box::pin(transfer(txn, from, to)), TransactionOptions::new().with_max_retries(3)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct IsolatedStore {
    connection: DatabaseConnection,
    isolation_level: IsolationLevel,
    access_mode: Option<AccessMode>,
}

impl IsolatedStore {
    pub fn new(connection: DatabaseConnection, isolation_level: IsolationLevel) -> Self {
        Self {
            connection,
            isolation_level,
            access_mode: None,
        }
    }

    pub fn serializable(connection: DatabaseConnection) -> Self {
        Self::new(connection, IsolationLevel::Serializable)
    }

    /// `REPEATABLE READ, READ ONLY`: a stable snapshot for multi-statement reads.
    pub fn read_only_snapshot(connection: DatabaseConnection) -> Self {
        Self::new(connection, IsolationLevel::RepeatableRead).with_access_mode(AccessMode::ReadOnly)
    }

    pub fn with_access_mode(mut self, access_mode: AccessMode) -> Self {
        self.access_mode = Some(access_mode);
        self
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}

#[async_trait]
impl TransactionStore for IsolatedStore {
    type Transaction = DatabaseTransaction;
    type Error = DbErr;

    async fn begin(&self) -> Result<Self::Transaction, Self::Error> {
        self.connection
            .begin_with_config(Some(self.isolation_level), self.access_mode)
            .await
    }

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), Self::Error> {
        transaction.commit().await
    }

    async fn rollback(&self, transaction: Self::Transaction) -> Result<(), Self::Error> {
        transaction.rollback().await
    }
}
