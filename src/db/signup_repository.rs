use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::signup::{NewPendingSignup, PendingSignup};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Keyed ephemeral storage for pre-authentication signups. Keys are
/// normalized emails; implementations must treat expired rows as absent.
#[async_trait]
pub trait SignupStore: Send + Sync {
    /// Last write wins: replaces any live record for the email and resets its TTL.
    async fn put(&self, signup: &NewPendingSignup) -> Result<PendingSignup, StoreError>;
    async fn get(&self, email: &str) -> Result<Option<PendingSignup>, StoreError>;
    /// Linearizable per key: concurrent callers see the record at most once.
    async fn consume_and_remove(&self, email: &str) -> Result<Option<PendingSignup>, StoreError>;
    /// Reinstates a consumed record unless a newer one took its slot or it expired.
    async fn restore(&self, signup: &PendingSignup) -> Result<bool, StoreError>;
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn delete_by_email(&self, email: &str) -> Result<bool, StoreError>;
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

/// Bounds every call to an inner store so no request blocks on storage.
pub struct TimedSignupStore {
    inner: Arc<dyn SignupStore>,
    limit: Duration,
}

impl TimedSignupStore {
    pub fn new(inner: Arc<dyn SignupStore>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, StoreError>>,
    {
        match timeout(self.limit, fut).await {
            Ok(res) => res,
            Err(_) => Err(StoreError::Timeout(self.limit)),
        }
    }
}

#[async_trait]
impl SignupStore for TimedSignupStore {
    async fn put(&self, signup: &NewPendingSignup) -> Result<PendingSignup, StoreError> {
        self.bounded(self.inner.put(signup)).await
    }

    async fn get(&self, email: &str) -> Result<Option<PendingSignup>, StoreError> {
        self.bounded(self.inner.get(email)).await
    }

    async fn consume_and_remove(&self, email: &str) -> Result<Option<PendingSignup>, StoreError> {
        // The consume runs detached so a timeout never abandons a row that the
        // backend already deleted; a late result is put back for the next caller.
        let inner = self.inner.clone();
        let key = email.to_string();
        let mut handle = tokio::spawn(async move { inner.consume_and_remove(&key).await });

        match timeout(self.limit, &mut handle).await {
            Ok(Ok(res)) => res,
            Ok(Err(join_err)) => Err(StoreError::Unavailable(join_err.to_string())),
            Err(_) => {
                let inner = self.inner.clone();
                let limit = self.limit;
                tokio::spawn(async move {
                    match handle.await {
                        Ok(Ok(Some(late))) => match inner.restore(&late).await {
                            Ok(true) => warn!(
                                email = %late.email,
                                ?limit,
                                "late consume result restored after timeout"
                            ),
                            Ok(false) => warn!(
                                email = %late.email,
                                "late consume result superseded or expired; not restored"
                            ),
                            Err(err) => error!(
                                email = %late.email,
                                ?err,
                                "failed to restore late consume result"
                            ),
                        },
                        Ok(Ok(None)) => {}
                        Ok(Err(err)) => warn!(?err, "timed-out consume eventually failed"),
                        Err(err) => error!(?err, "timed-out consume task panicked"),
                    }
                });
                Err(StoreError::Timeout(self.limit))
            }
        }
    }

    async fn restore(&self, signup: &PendingSignup) -> Result<bool, StoreError> {
        // Same as consume: a restore cut off by the timeout keeps running so
        // the record still lands back in the store.
        let inner = self.inner.clone();
        let record = signup.clone();
        let mut handle = tokio::spawn(async move { inner.restore(&record).await });

        match timeout(self.limit, &mut handle).await {
            Ok(Ok(res)) => res,
            Ok(Err(join_err)) => Err(StoreError::Unavailable(join_err.to_string())),
            Err(_) => {
                let email = signup.email.clone();
                tokio::spawn(async move {
                    match handle.await {
                        Ok(Ok(restored)) => {
                            warn!(%email, restored, "restore completed after timeout")
                        }
                        Ok(Err(err)) => error!(%email, ?err, "restore failed after timeout"),
                        Err(err) => error!(%email, ?err, "timed-out restore task panicked"),
                    }
                });
                Err(StoreError::Timeout(self.limit))
            }
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        self.bounded(self.inner.delete_by_id(id)).await
    }

    async fn delete_by_email(&self, email: &str) -> Result<bool, StoreError> {
        self.bounded(self.inner.delete_by_email(email)).await
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.bounded(self.inner.purge_expired()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::mock_db::{FailingSignupStore, SlowSignupStore};
    use crate::db::memory_signup_repository::MemorySignupStore;
    use crate::models::signup::IntakePayload;

    fn new_signup(email: &str) -> NewPendingSignup {
        IntakePayload {
            email: Some(email.into()),
            name: Some("Lead".into()),
            bottlenecks: Some("b".into()),
            current_ai_usage: Some("c".into()),
            priority_outcome: Some("p".into()),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn passes_results_through_when_fast() {
        let inner = Arc::new(MemorySignupStore::new(chrono::Duration::minutes(30)));
        let store = TimedSignupStore::new(inner, Duration::from_secs(1));
        store.put(&new_signup("fast@example.com")).await.unwrap();
        assert!(store.get("fast@example.com").await.unwrap().is_some());
        assert!(store
            .consume_and_remove("fast@example.com")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn surfaces_unavailable_inner_store() {
        let store = TimedSignupStore::new(Arc::new(FailingSignupStore), Duration::from_secs(1));
        let err = store.put(&new_signup("down@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let memory = Arc::new(MemorySignupStore::new(chrono::Duration::minutes(30)));
        let slow = Arc::new(SlowSignupStore::new(memory, Duration::from_millis(200)));
        let store = TimedSignupStore::new(slow, Duration::from_millis(20));
        let err = store.get("slow@example.com").await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
    }

    #[tokio::test]
    async fn timed_out_consume_is_restored_not_dropped() {
        let memory = Arc::new(MemorySignupStore::new(chrono::Duration::minutes(30)));
        memory.put(&new_signup("late@example.com")).await.unwrap();

        let slow = Arc::new(SlowSignupStore::new(memory.clone(), Duration::from_millis(100)));
        let store = TimedSignupStore::new(slow, Duration::from_millis(10));

        let err = store.consume_and_remove("late@example.com").await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let restored = memory.get("late@example.com").await.unwrap();
        assert!(restored.is_some(), "late consume should be put back");
        assert!(restored.unwrap().consumed_at.is_none());
    }

    #[tokio::test]
    async fn timed_out_restore_still_lands() {
        let memory = Arc::new(MemorySignupStore::new(chrono::Duration::minutes(30)));
        memory.put(&new_signup("back@example.com")).await.unwrap();
        let consumed = memory
            .consume_and_remove("back@example.com")
            .await
            .unwrap()
            .unwrap();

        let slow = Arc::new(SlowSignupStore::new(memory.clone(), Duration::from_millis(100)));
        let store = TimedSignupStore::new(slow, Duration::from_millis(10));

        let err = store.restore(&consumed).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(memory.get("back@example.com").await.unwrap().is_some());
    }
}
