//! PostgreSQL connector and transaction store
//!
//! `DatabaseConnection` implements [`TransactionStore`](crate::transaction::TransactionStore)
//! directly; [`IsolatedStore`] pins an isolation level for every transaction it begins.

mod config;
mod connector;
mod store;

pub use config::PostgresConfig;
pub use connector::{connect, connect_from_config, connect_with_options, connect_with_retry};
pub use store::IsolatedStore;

// Re-export SeaORM types for convenience
pub use sea_orm::{
    AccessMode, ConnectOptions, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel,
};
