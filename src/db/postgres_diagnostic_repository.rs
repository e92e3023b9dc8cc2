use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::diagnostic_repository::DiagnosticLog;
use super::signup_repository::StoreError;
use crate::models::diagnostic::{DiagnosticEvent, Severity};

#[derive(FromRow)]
struct DiagnosticRow {
    seq: i64,
    recorded_at: DateTime<Utc>,
    severity: String,
    message: String,
}

impl TryFrom<DiagnosticRow> for DiagnosticEvent {
    type Error = StoreError;

    fn try_from(row: DiagnosticRow) -> Result<Self, Self::Error> {
        Ok(DiagnosticEvent {
            seq: row.seq,
            recorded_at: row.recorded_at,
            severity: row.severity.parse::<Severity>().map_err(StoreError::Corrupt)?,
            message: row.message,
        })
    }
}

/// Diagnostic log shared by every instance; trimmed to `capacity` on append.
pub struct PostgresDiagnosticLog {
    pub pool: PgPool,
    pub capacity: usize,
}

impl PostgresDiagnosticLog {
    fn capacity(&self) -> i64 {
        self.capacity.max(1) as i64
    }
}

#[async_trait]
impl DiagnosticLog for PostgresDiagnosticLog {
    async fn append(
        &self,
        severity: Severity,
        message: &str,
    ) -> Result<DiagnosticEvent, StoreError> {
        let row = sqlx::query_as::<_, DiagnosticRow>(
            r#"
            INSERT INTO diagnostic_events (severity, message)
            VALUES ($1, $2)
            RETURNING seq, recorded_at, severity, message
            "#,
        )
        .bind(severity.as_str())
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM diagnostic_events
            WHERE seq < (
                SELECT seq FROM diagnostic_events
                ORDER BY seq DESC
                OFFSET $1 - 1 LIMIT 1
            )
            "#,
        )
        .bind(self.capacity())
        .execute(&self.pool)
        .await?;

        row.try_into()
    }

    async fn list(&self) -> Result<Vec<DiagnosticEvent>, StoreError> {
        let rows = sqlx::query_as::<_, DiagnosticRow>(
            r#"
            SELECT seq, recorded_at, severity, message FROM (
                SELECT seq, recorded_at, severity, message
                FROM diagnostic_events
                ORDER BY seq DESC
                LIMIT $1
            ) newest
            ORDER BY seq ASC
            "#,
        )
        .bind(self.capacity())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DiagnosticEvent::try_from).collect()
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM diagnostic_events")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
