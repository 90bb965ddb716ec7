//! In-memory [`TransactionStore`] (for development/testing).
//!
//! Writes are staged on the transaction handle and only become visible to
//! other transactions on commit, so a rolled-back attempt leaves no trace.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use super::store::TransactionStore;
use crate::common::DatabaseError;

type Table = HashMap<String, String>;

#[derive(Debug, Default)]
struct Counters {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

/// Point-in-time view of how a store has been used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub begun: u64,
    pub committed: u64,
    pub rolled_back: u64,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    data: Arc<RwLock<Table>>,
    counters: Arc<Counters>,
}

/// Handle for one in-memory transaction.
#[derive(Debug)]
pub struct InMemoryTransaction {
    id: u64,
    data: Arc<RwLock<Table>>,
    staged: Mutex<Table>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed value for `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            begun: self.counters.begun.load(Ordering::SeqCst),
            committed: self.counters.committed.load(Ordering::SeqCst),
            rolled_back: self.counters.rolled_back.load(Ordering::SeqCst),
        }
    }
}

impl InMemoryTransaction {
    /// Sequence number of this transaction within its store, starting at 1.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stage a write; visible to other transactions only after commit.
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    /// Read own staged writes first, then committed data.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self
            .staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Some(value.clone());
        }
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    type Transaction = InMemoryTransaction;
    type Error = DatabaseError;

    async fn begin(&self) -> Result<Self::Transaction, Self::Error> {
        let id = self.counters.begun.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(InMemoryTransaction {
            id,
            data: Arc::clone(&self.data),
            staged: Mutex::new(Table::new()),
        })
    }

    async fn commit(&self, transaction: Self::Transaction) -> Result<(), Self::Error> {
        let staged = transaction
            .staged
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        self.data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(staged);
        self.counters.committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, transaction: Self::Transaction) -> Result<(), Self::Error> {
        drop(transaction);
        self.counters.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_publishes_staged_writes() {
        let store = InMemoryStore::new();
        let tx = store.begin().await.unwrap();
        tx.put("task:1", "open");

        assert_eq!(tx.get("task:1").as_deref(), Some("open"));
        assert!(store.get("task:1").is_none());

        store.commit(tx).await.unwrap();
        assert_eq!(store.get("task:1").as_deref(), Some("open"));
        assert_eq!(store.stats().committed, 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_staged_writes() {
        let store = InMemoryStore::new();
        let tx = store.begin().await.unwrap();
        tx.put("task:1", "open");
        store.rollback(tx).await.unwrap();

        assert!(store.is_empty());
        assert_eq!(
            store.stats(),
            StoreStats {
                begun: 1,
                committed: 0,
                rolled_back: 1
            }
        );
    }
}
