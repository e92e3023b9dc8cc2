use async_trait::async_trait;

use super::signup_repository::StoreError;
use crate::models::diagnostic::{DiagnosticEvent, Severity};

/// Bounded operator-facing event log. Oldest entries are evicted first.
#[async_trait]
pub trait DiagnosticLog: Send + Sync {
    async fn append(&self, severity: Severity, message: &str)
        -> Result<DiagnosticEvent, StoreError>;
    /// Oldest to newest.
    async fn list(&self) -> Result<Vec<DiagnosticEvent>, StoreError>;
    async fn clear(&self) -> Result<u64, StoreError>;
}
