use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::signup_repository::{SignupStore, StoreError};
use crate::models::signup::{normalize_email, NewPendingSignup, PendingSignup};

const COLUMNS: &str = "id, email, name, phone, business, bottlenecks, current_ai_usage, \
     priority_outcome, plan, billing_cycle, created_at, expires_at, consumed_at";

/// Shared correlation store. Every instance behind the load balancer talks to
/// the same table, and per-key atomicity comes from single-statement
/// `DELETE ... RETURNING`.
pub struct PostgresSignupStore {
    pub pool: PgPool,
    pub ttl: chrono::Duration,
}

impl PostgresSignupStore {
    fn ttl_seconds(&self) -> f64 {
        self.ttl.num_milliseconds() as f64 / 1000.0
    }
}

#[async_trait]
impl SignupStore for PostgresSignupStore {
    async fn put(&self, signup: &NewPendingSignup) -> Result<PendingSignup, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO pending_signups
                (id, email, name, phone, business, bottlenecks, current_ai_usage,
                 priority_outcome, plan, billing_cycle, created_at, expires_at, consumed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    now(), now() + make_interval(secs => $11), NULL)
            ON CONFLICT (email) DO UPDATE SET
                id = EXCLUDED.id,
                name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                business = EXCLUDED.business,
                bottlenecks = EXCLUDED.bottlenecks,
                current_ai_usage = EXCLUDED.current_ai_usage,
                priority_outcome = EXCLUDED.priority_outcome,
                plan = EXCLUDED.plan,
                billing_cycle = EXCLUDED.billing_cycle,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at,
                consumed_at = NULL
            RETURNING {COLUMNS}
            "#
        );

        let record = sqlx::query_as::<_, PendingSignup>(&sql)
            .bind(Uuid::new_v4())
            .bind(normalize_email(&signup.email))
            .bind(&signup.name)
            .bind(&signup.phone)
            .bind(&signup.business)
            .bind(&signup.bottlenecks)
            .bind(&signup.current_ai_usage)
            .bind(&signup.priority_outcome)
            .bind(&signup.plan)
            .bind(&signup.billing_cycle)
            .bind(self.ttl_seconds())
            .fetch_one(&self.pool)
            .await?;
        Ok(record)
    }

    async fn get(&self, email: &str) -> Result<Option<PendingSignup>, StoreError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM pending_signups \
             WHERE email = $1 AND consumed_at IS NULL AND expires_at > now()"
        );
        let record = sqlx::query_as::<_, PendingSignup>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn consume_and_remove(&self, email: &str) -> Result<Option<PendingSignup>, StoreError> {
        // Row-level locking inside a single DELETE makes concurrent callers
        // serialize on the row; only the first one gets it back.
        let record = sqlx::query_as::<_, PendingSignup>(
            r#"
            DELETE FROM pending_signups
            WHERE email = $1 AND consumed_at IS NULL AND expires_at > now()
            RETURNING id, email, name, phone, business, bottlenecks, current_ai_usage,
                      priority_outcome, plan, billing_cycle, created_at, expires_at,
                      now() AS consumed_at
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn restore(&self, signup: &PendingSignup) -> Result<bool, StoreError> {
        if signup.expires_at <= Utc::now() {
            return Ok(false);
        }
        let result = sqlx::query(
            r#"
            INSERT INTO pending_signups
                (id, email, name, phone, business, bottlenecks, current_ai_usage,
                 priority_outcome, plan, billing_cycle, created_at, expires_at, consumed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NULL)
            ON CONFLICT (email) DO UPDATE SET
                id = EXCLUDED.id,
                name = EXCLUDED.name,
                phone = EXCLUDED.phone,
                business = EXCLUDED.business,
                bottlenecks = EXCLUDED.bottlenecks,
                current_ai_usage = EXCLUDED.current_ai_usage,
                priority_outcome = EXCLUDED.priority_outcome,
                plan = EXCLUDED.plan,
                billing_cycle = EXCLUDED.billing_cycle,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at,
                consumed_at = NULL
            WHERE pending_signups.consumed_at IS NOT NULL
               OR pending_signups.expires_at <= now()
            "#,
        )
        .bind(signup.id)
        .bind(normalize_email(&signup.email))
        .bind(&signup.name)
        .bind(&signup.phone)
        .bind(&signup.business)
        .bind(&signup.bottlenecks)
        .bind(&signup.current_ai_usage)
        .bind(&signup.priority_outcome)
        .bind(&signup.plan)
        .bind(&signup.billing_cycle)
        .bind(signup.created_at)
        .bind(signup.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM pending_signups WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_email(&self, email: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM pending_signups WHERE email = $1")
            .bind(normalize_email(email))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM pending_signups WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

// Needs a reachable Postgres (`DATABASE_URL`); run with `cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::signup::IntakePayload;
    use std::sync::Arc;

    fn new_signup(email: &str, bottlenecks: &str) -> NewPendingSignup {
        IntakePayload {
            email: Some(email.into()),
            name: Some("Lead".into()),
            bottlenecks: Some(bottlenecks.into()),
            current_ai_usage: Some("none".into()),
            priority_outcome: Some("growth".into()),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn store(pool: PgPool, ttl: chrono::Duration) -> PostgresSignupStore {
        PostgresSignupStore { pool, ttl }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_consumers_get_the_row_once(pool: PgPool) {
        let store = Arc::new(store(pool, chrono::Duration::minutes(30)));
        store.put(&new_signup("race@example.com", "b")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.consume_and_remove("Race@Example.com").await.unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if let Some(record) = handle.await.unwrap() {
                assert!(record.consumed_at.is_some());
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(store.get("race@example.com").await.unwrap().is_none());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn put_overwrites_and_restore_never_clobbers(pool: PgPool) {
        let store = store(pool, chrono::Duration::minutes(30));
        store.put(&new_signup("a@example.com", "first")).await.unwrap();
        store.put(&new_signup("A@example.com", "second")).await.unwrap();
        let consumed = store
            .consume_and_remove("a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(consumed.bottlenecks, "second");

        store.put(&new_signup("a@example.com", "third")).await.unwrap();
        assert!(!store.restore(&consumed).await.unwrap());
        assert_eq!(
            store.get("a@example.com").await.unwrap().unwrap().bottlenecks,
            "third"
        );

        store.delete_by_email("a@example.com").await.unwrap();
        assert!(store.restore(&consumed).await.unwrap());
        let back = store.get("a@example.com").await.unwrap().unwrap();
        assert_eq!(back.bottlenecks, "second");
        assert!(back.consumed_at.is_none());
        assert!(store.delete_by_id(back.id).await.unwrap());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn expired_rows_are_absent_and_purged(pool: PgPool) {
        let store = store(pool, chrono::Duration::milliseconds(200));
        store.put(&new_signup("old@example.com", "b")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;

        assert!(store.get("old@example.com").await.unwrap().is_none());
        assert!(store
            .consume_and_remove("old@example.com")
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.purge_expired().await.unwrap(), 1);
    }
}
