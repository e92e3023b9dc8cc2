use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use uuid::Uuid;

use super::signup_repository::{SignupStore, StoreError};
use crate::models::signup::{normalize_email, NewPendingSignup, PendingSignup};

/// Process-local store. Each shard lock makes per-key operations atomic, which
/// is enough for single-instance deployments and tests; horizontally scaled
/// deployments use [`super::postgres_signup_repository::PostgresSignupStore`].
pub struct MemorySignupStore {
    records: DashMap<String, PendingSignup>,
    ttl: chrono::Duration,
}

impl MemorySignupStore {
    pub fn new(ttl: chrono::Duration) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SignupStore for MemorySignupStore {
    async fn put(&self, signup: &NewPendingSignup) -> Result<PendingSignup, StoreError> {
        let record = PendingSignup::from_new(signup, Utc::now(), self.ttl);
        self.records.insert(record.email.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, email: &str) -> Result<Option<PendingSignup>, StoreError> {
        let now = Utc::now();
        Ok(self
            .records
            .get(&normalize_email(email))
            .filter(|r| r.is_live_at(now))
            .map(|r| r.value().clone()))
    }

    async fn consume_and_remove(&self, email: &str) -> Result<Option<PendingSignup>, StoreError> {
        let now = Utc::now();
        let key = normalize_email(email);
        match self.records.remove_if(&key, |_, r| r.is_live_at(now)) {
            Some((_, mut record)) => {
                record.consumed_at = Some(now);
                Ok(Some(record))
            }
            None => {
                self.records.remove_if(&key, |_, r| !r.is_live_at(now));
                Ok(None)
            }
        }
    }

    async fn restore(&self, signup: &PendingSignup) -> Result<bool, StoreError> {
        let now = Utc::now();
        let mut record = signup.clone();
        record.consumed_at = None;
        if !record.is_live_at(now) {
            return Ok(false);
        }
        match self.records.entry(normalize_email(&record.email)) {
            Entry::Occupied(mut slot) => {
                if slot.get().is_live_at(now) {
                    Ok(false)
                } else {
                    slot.insert(record);
                    Ok(true)
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, StoreError> {
        let key = self
            .records
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.key().clone());
        Ok(match key {
            Some(key) => self.records.remove_if(&key, |_, r| r.id == id).is_some(),
            None => false,
        })
    }

    async fn delete_by_email(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.records.remove(&normalize_email(email)).is_some())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let before = self.records.len();
        self.records.retain(|_, r| r.is_live_at(now));
        Ok(before.saturating_sub(self.records.len()) as u64)
    }
}
