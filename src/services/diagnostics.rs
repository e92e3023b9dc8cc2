use std::{sync::Arc, time::Duration};

use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::db::diagnostic_repository::DiagnosticLog;
use crate::models::diagnostic::{DiagnosticEvent, Severity};

/// Longest a caller waits for an append before moving on.
pub const DEFAULT_APPEND_WAIT: Duration = Duration::from_millis(250);

/// Owned handle on the diagnostic log. Every event is mirrored to `tracing`,
/// and a failing or stalled log never fails or holds up the caller.
#[derive(Clone)]
pub struct Diagnostics {
    log: Arc<dyn DiagnosticLog>,
    append_wait: Duration,
}

impl Diagnostics {
    pub fn new(log: Arc<dyn DiagnosticLog>) -> Self {
        Self::with_append_wait(log, DEFAULT_APPEND_WAIT)
    }

    pub fn with_append_wait(log: Arc<dyn DiagnosticLog>, append_wait: Duration) -> Self {
        Self { log, append_wait }
    }

    pub fn log(&self) -> &Arc<dyn DiagnosticLog> {
        &self.log
    }

    /// Appends run on their own task; past `append_wait` the write finishes in
    /// the background and the caller gets `None`.
    pub async fn record(
        &self,
        severity: Severity,
        message: impl AsRef<str>,
    ) -> Option<DiagnosticEvent> {
        let message = message.as_ref().to_string();
        match severity {
            Severity::Info => info!(target: "diagnostics", "{message}"),
            Severity::Warn => warn!(target: "diagnostics", "{message}"),
            Severity::Error => error!(target: "diagnostics", "{message}"),
        }

        let log = self.log.clone();
        let mut handle = tokio::spawn(async move { log.append(severity, &message).await });
        match timeout(self.append_wait, &mut handle).await {
            Ok(Ok(Ok(event))) => Some(event),
            Ok(Ok(Err(err))) => {
                warn!(?err, "failed to append diagnostic event");
                None
            }
            Ok(Err(join_err)) => {
                warn!(?join_err, "diagnostic append task failed");
                None
            }
            Err(_) => {
                warn!(wait = ?self.append_wait, "diagnostic append still pending; not waiting");
                None
            }
        }
    }

    pub async fn info(&self, message: impl AsRef<str>) -> Option<DiagnosticEvent> {
        self.record(Severity::Info, message).await
    }

    pub async fn warn(&self, message: impl AsRef<str>) -> Option<DiagnosticEvent> {
        self.record(Severity::Warn, message).await
    }

    pub async fn error(&self, message: impl AsRef<str>) -> Option<DiagnosticEvent> {
        self.record(Severity::Error, message).await
    }
}
