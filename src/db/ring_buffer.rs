use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::diagnostic_repository::DiagnosticLog;
use super::signup_repository::StoreError;
use crate::models::diagnostic::{DiagnosticEvent, Severity};

struct Inner {
    events: VecDeque<DiagnosticEvent>,
    next_seq: i64,
}

/// In-process fixed-capacity diagnostic log.
pub struct RingBuffer {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl RingBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: Mutex::new(Inner {
                events: VecDeque::with_capacity(capacity),
                next_seq: 1,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("diagnostic buffer lock poisoned".into()))
    }
}

#[async_trait]
impl DiagnosticLog for RingBuffer {
    async fn append(
        &self,
        severity: Severity,
        message: &str,
    ) -> Result<DiagnosticEvent, StoreError> {
        let mut inner = self.lock()?;
        let event = DiagnosticEvent {
            seq: inner.next_seq,
            recorded_at: Utc::now(),
            severity,
            message: message.to_string(),
        };
        inner.next_seq += 1;
        if inner.events.len() >= self.capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(event.clone());
        Ok(event)
    }

    async fn list(&self) -> Result<Vec<DiagnosticEvent>, StoreError> {
        Ok(self.lock()?.events.iter().cloned().collect())
    }

    async fn clear(&self) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let removed = inner.events.len() as u64;
        inner.events.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn keeps_the_most_recent_entries_oldest_first() {
        let buffer = RingBuffer::with_capacity(3);
        for i in 0..5 {
            buffer
                .append(Severity::Info, &format!("event {i}"))
                .await
                .unwrap();
        }

        let events = buffer.list().await.unwrap();
        let messages: Vec<_> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["event 2", "event 3", "event 4"]);
        let seqs: Vec<_> = events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn list_is_bounded_by_occupancy() {
        let buffer = RingBuffer::with_capacity(500);
        buffer.append(Severity::Warn, "only one").await.unwrap();
        assert_eq!(buffer.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_but_sequence_keeps_increasing() {
        let buffer = RingBuffer::with_capacity(10);
        buffer.append(Severity::Info, "a").await.unwrap();
        buffer.append(Severity::Error, "b").await.unwrap();

        assert_eq!(buffer.clear().await.unwrap(), 2);
        assert!(buffer.list().await.unwrap().is_empty());

        let next = buffer.append(Severity::Info, "c").await.unwrap();
        assert_eq!(next.seq, 3);
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped() {
        let buffer = RingBuffer::with_capacity(0);
        assert_eq!(buffer.capacity(), 1);
        buffer.append(Severity::Info, "a").await.unwrap();
        buffer.append(Severity::Info, "b").await.unwrap();
        let events = buffer.list().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "b");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_not_lost() {
        let buffer = Arc::new(RingBuffer::with_capacity(1_000));
        let mut handles = Vec::new();
        for task in 0..8 {
            let buffer = buffer.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    buffer
                        .append(Severity::Info, &format!("task {task} #{i}"))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let events = buffer.list().await.unwrap();
        assert_eq!(events.len(), 400);
        let mut seqs: Vec<_> = events.iter().map(|e| e.seq).collect();
        seqs.dedup();
        assert_eq!(seqs.len(), 400, "every append gets its own sequence number");
        assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
    }
}
