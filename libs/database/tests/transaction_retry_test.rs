//! Retry, backoff and timeout behavior of `with_transaction` against the
//! in-memory store and a scripted store.

use async_trait::async_trait;
use database::DatabaseError;
use database::transaction::{
    InMemoryStore, TransactionError, TransactionOptions, TransactionStore,
    with_read_only_transaction, with_transaction,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn conflict(attempt: usize) -> DatabaseError {
    DatabaseError::Query {
        code: Some("40001".to_string()),
        message: format!("could not serialize access (attempt {attempt})"),
    }
}

/// Store whose commit and rollback outcomes are set up front.
#[derive(Default)]
struct ScriptedStore {
    /// Number of leading commits that fail with a serialization conflict.
    conflicting_commits: u32,
    failing_rollback: bool,
    commits: AtomicU32,
    rollbacks: AtomicU32,
}

#[async_trait]
impl TransactionStore for ScriptedStore {
    type Transaction = ();
    type Error = DatabaseError;

    async fn begin(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn commit(&self, _transaction: ()) -> Result<(), DatabaseError> {
        let commit = self.commits.fetch_add(1, Ordering::SeqCst);
        if commit < self.conflicting_commits {
            return Err(conflict(commit as usize));
        }
        Ok(())
    }

    async fn rollback(&self, _transaction: ()) -> Result<(), DatabaseError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        if self.failing_rollback {
            return Err(DatabaseError::ConnectionFailed(
                "connection reset during rollback".to_string(),
            ));
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn retry_bound_returns_last_attempt_error() {
    let store = InMemoryStore::new();
    let invocations = Arc::new(Mutex::new(Vec::new()));
    let max_retries = 3;

    let err = with_transaction(
        &store,
        |_tx| {
            let invocations = invocations.clone();
            Box::pin(async move {
                let attempt = {
                    let mut calls = invocations.lock().unwrap();
                    calls.push(Instant::now());
                    calls.len() - 1
                };
                Err::<(), _>(conflict(attempt))
            })
        },
        TransactionOptions::new().with_max_retries(max_retries),
    )
    .await
    .unwrap_err();

    assert_eq!(invocations.lock().unwrap().len(), max_retries as usize + 1);

    match err {
        TransactionError::Failed(DatabaseError::Query { code, message }) => {
            assert_eq!(code.as_deref(), Some("40001"));
            assert!(message.ends_with("(attempt 3)"), "{message}");
        }
        other => panic!("expected the last store error, got {other:?}"),
    }

    let stats = store.stats();
    assert_eq!(stats.begun, 4);
    assert_eq!(stats.rolled_back, 4);
    assert_eq!(stats.committed, 0);
}

#[tokio::test(start_paused = true)]
async fn backoff_delays_are_linear_in_attempt_number() {
    let store = InMemoryStore::new();
    let invocations = Arc::new(Mutex::new(Vec::new()));
    let base = Duration::from_millis(100);

    let _ = with_transaction(
        &store,
        |_tx| {
            let invocations = invocations.clone();
            Box::pin(async move {
                invocations.lock().unwrap().push(Instant::now());
                Err::<(), _>(conflict(0))
            })
        },
        TransactionOptions::new()
            .with_max_retries(3)
            .with_retry_base_delay(base),
    )
    .await;

    let calls = invocations.lock().unwrap().clone();
    let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(gaps.len(), 3);

    for (attempt, gap) in gaps.iter().enumerate() {
        let expected = base * (attempt as u32 + 1);
        let low = expected.mul_f64(0.8);
        let high = expected.mul_f64(1.2);
        assert!(
            *gap >= low && *gap <= high,
            "retry {attempt}: waited {gap:?}, expected ~{expected:?}"
        );
    }
    assert!(gaps.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_short_circuits() {
    let store = InMemoryStore::new();
    let invocations = Arc::new(Mutex::new(0usize));

    let err = with_transaction(
        &store,
        |_tx| {
            let invocations = invocations.clone();
            Box::pin(async move {
                *invocations.lock().unwrap() += 1;
                Err::<(), _>(DatabaseError::Query {
                    code: Some("23503".to_string()),
                    message: "insert or update on table \"tasks\" violates foreign key constraint"
                        .to_string(),
                })
            })
        },
        TransactionOptions::new().with_max_retries(10),
    )
    .await
    .unwrap_err();

    assert_eq!(*invocations.lock().unwrap(), 1);
    assert!(matches!(
        err.into_inner(),
        Some(DatabaseError::Query { code: Some(code), .. }) if code == "23503"
    ));
}

#[tokio::test(start_paused = true)]
async fn timeout_fails_at_deadline_without_retry() {
    let store = InMemoryStore::new();
    let invocations = Arc::new(Mutex::new(0usize));
    let started = Instant::now();

    let err = with_transaction(
        &store,
        |tx| {
            let invocations = invocations.clone();
            Box::pin(async move {
                *invocations.lock().unwrap() += 1;
                tx.put("task:1", "half-written");
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, DatabaseError>(())
            })
        },
        TransactionOptions::new()
            .with_max_retries(5)
            .with_timeout_ms(500),
    )
    .await
    .unwrap_err();

    let elapsed = started.elapsed();
    assert!(matches!(
        err,
        TransactionError::Timeout { attempt: 0, timeout } if timeout == Duration::from_millis(500)
    ));
    assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_millis(600));
    assert_eq!(*invocations.lock().unwrap(), 1);
    // The abandoned attempt's staged write never became visible.
    assert!(store.get("task:1").is_none());
}

#[tokio::test(start_paused = true)]
async fn success_on_retry_commits_only_the_final_attempt() {
    let store = InMemoryStore::new();
    let invocations = Arc::new(Mutex::new(0usize));

    let committed = with_transaction(
        &store,
        |tx| {
            let invocations = invocations.clone();
            Box::pin(async move {
                let attempt = {
                    let mut n = invocations.lock().unwrap();
                    *n += 1;
                    *n
                };
                tx.put(format!("attempt:{attempt}"), "written");
                if attempt == 1 {
                    return Err(conflict(attempt));
                }
                Ok(attempt)
            })
        },
        TransactionOptions::new().with_max_retries(1),
    )
    .await
    .unwrap();

    assert_eq!(committed, 2);
    assert!(store.get("attempt:1").is_none());
    assert_eq!(store.get("attempt:2").as_deref(), Some("written"));
}

#[tokio::test]
async fn read_only_variant_sees_committed_data() {
    let store = InMemoryStore::new();

    with_transaction(
        &store,
        |tx| {
            Box::pin(async move {
                tx.put("product:42", "Widget");
                Ok::<_, DatabaseError>(())
            })
        },
        TransactionOptions::default(),
    )
    .await
    .unwrap();

    let name = with_read_only_transaction(&store, |tx| {
        Box::pin(async move {
            tx.get("product:42")
                .ok_or_else(|| DatabaseError::Generic("missing product".to_string()))
        })
    })
    .await
    .unwrap();

    assert_eq!(name, "Widget");
}

#[tokio::test(start_paused = true)]
async fn failed_rollback_keeps_unit_of_work_error() {
    let store = ScriptedStore {
        failing_rollback: true,
        ..Default::default()
    };
    let invocations = Arc::new(Mutex::new(0usize));

    let err = with_transaction(
        &store,
        |_tx| {
            let invocations = invocations.clone();
            Box::pin(async move {
                *invocations.lock().unwrap() += 1;
                Err::<(), _>(DatabaseError::Query {
                    code: Some("23505".to_string()),
                    message: "duplicate key value violates unique constraint".to_string(),
                })
            })
        },
        TransactionOptions::new().with_max_retries(2),
    )
    .await
    .unwrap_err();

    match err {
        TransactionError::Failed(DatabaseError::Query { code, .. }) => {
            assert_eq!(code.as_deref(), Some("23505"));
        }
        other => panic!("expected the unit of work error, got {other:?}"),
    }
    assert_eq!(*invocations.lock().unwrap(), 1);
    assert_eq!(store.rollbacks.load(Ordering::SeqCst), 1);
    assert_eq!(store.commits.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn conflict_at_commit_is_retried() {
    let store = ScriptedStore {
        conflicting_commits: 1,
        ..Default::default()
    };
    let invocations = Arc::new(Mutex::new(0usize));

    let value = with_transaction(
        &store,
        |_tx| {
            let invocations = invocations.clone();
            Box::pin(async move {
                *invocations.lock().unwrap() += 1;
                Ok::<_, DatabaseError>(7)
            })
        },
        TransactionOptions::new().with_max_retries(2),
    )
    .await
    .unwrap();

    assert_eq!(value, 7);
    assert_eq!(*invocations.lock().unwrap(), 2);
    assert_eq!(store.commits.load(Ordering::SeqCst), 2);
    assert_eq!(store.rollbacks.load(Ordering::SeqCst), 0);
}
