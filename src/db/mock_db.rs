use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use uuid::Uuid;

use super::diagnostic_repository::DiagnosticLog;
use super::signup_repository::{SignupStore, StoreError};
use crate::models::diagnostic::{DiagnosticEvent, Severity};
use crate::models::signup::{NewPendingSignup, PendingSignup};

fn unavailable() -> StoreError {
    StoreError::Unavailable("Mock DB failure".into())
}

/// Store that is never reachable.
#[allow(dead_code)]
pub struct FailingSignupStore;

#[async_trait]
impl SignupStore for FailingSignupStore {
    async fn put(&self, _: &NewPendingSignup) -> Result<PendingSignup, StoreError> {
        Err(unavailable())
    }

    async fn get(&self, _: &str) -> Result<Option<PendingSignup>, StoreError> {
        Err(unavailable())
    }

    async fn consume_and_remove(&self, _: &str) -> Result<Option<PendingSignup>, StoreError> {
        Err(unavailable())
    }

    async fn restore(&self, _: &PendingSignup) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn delete_by_id(&self, _: Uuid) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn delete_by_email(&self, _: &str) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        Err(unavailable())
    }
}

/// Delays every call before delegating, to exercise timeouts.
#[allow(dead_code)]
pub struct SlowSignupStore {
    inner: Arc<dyn SignupStore>,
    delay: Duration,
}

impl SlowSignupStore {
    #[allow(dead_code)]
    pub fn new(inner: Arc<dyn SignupStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl SignupStore for SlowSignupStore {
    async fn put(&self, signup: &NewPendingSignup) -> Result<PendingSignup, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(signup).await
    }

    async fn get(&self, email: &str) -> Result<Option<PendingSignup>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(email).await
    }

    async fn consume_and_remove(&self, email: &str) -> Result<Option<PendingSignup>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.consume_and_remove(email).await
    }

    async fn restore(&self, signup: &PendingSignup) -> Result<bool, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.restore(signup).await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_by_id(id).await
    }

    async fn delete_by_email(&self, email: &str) -> Result<bool, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_by_email(email).await
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.purge_expired().await
    }
}

/// Diagnostic sink that rejects every write.
#[allow(dead_code)]
pub struct FailingDiagnosticLog;

#[async_trait]
impl DiagnosticLog for FailingDiagnosticLog {
    async fn append(&self, _: Severity, _: &str) -> Result<DiagnosticEvent, StoreError> {
        Err(unavailable())
    }

    async fn list(&self) -> Result<Vec<DiagnosticEvent>, StoreError> {
        Err(unavailable())
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        Err(unavailable())
    }
}

/// Diagnostic sink whose writes never complete in time.
#[allow(dead_code)]
pub struct StalledDiagnosticLog;

#[async_trait]
impl DiagnosticLog for StalledDiagnosticLog {
    async fn append(&self, _: Severity, _: &str) -> Result<DiagnosticEvent, StoreError> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Err(unavailable())
    }

    async fn list(&self) -> Result<Vec<DiagnosticEvent>, StoreError> {
        Ok(Vec::new())
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        Ok(0)
    }
}
