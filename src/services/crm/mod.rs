use async_trait::async_trait;
use thiserror::Error;

use crate::models::contact::ContactRecord;

mod high_level;

pub use high_level::HighLevelCrm;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("crm request failed: {0}")]
    Transport(String),
    #[error("crm responded with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl From<reqwest::Error> for CrmError {
    fn from(err: reqwest::Error) -> Self {
        CrmError::Transport(err.to_string())
    }
}

/// Downstream contact sink. Retry policy, if any, lives inside implementations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CrmConnector: Send + Sync {
    async fn push_contact(&self, contact: &ContactRecord) -> Result<(), CrmError>;
}
