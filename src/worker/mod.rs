use std::time::Duration;

use crate::state::AppState;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Spawns the expired-signup sweep. Expiry is already enforced lazily on every
/// read and consume; the sweep only reclaims storage.
pub async fn start_background_workers(state: AppState, sweep_every: Option<Duration>) {
    let Some(period) = sweep_every else {
        debug!("pending signup sweep disabled");
        return;
    };

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_expired_signups(&state).await;
        }
    });
}

pub async fn sweep_expired_signups(state: &AppState) -> u64 {
    match state.signups.purge_expired().await {
        Ok(0) => 0,
        Ok(purged) => {
            state
                .diagnostics
                .info(format!("swept {purged} expired pending signup(s)"))
                .await;
            purged
        }
        Err(e) => {
            warn!(?e, "pending signup sweep failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{
        db::{
            memory_signup_repository::MemorySignupStore, mock_db::FailingSignupStore,
            signup_repository::SignupStore,
        },
        models::signup::IntakePayload,
        state::test_support::base_state,
    };

    fn lead(email: &str) -> IntakePayload {
        IntakePayload {
            email: Some(email.into()),
            name: Some("Lead".into()),
            bottlenecks: Some("Follow-up".into()),
            current_ai_usage: Some("None".into()),
            priority_outcome: Some("Growth".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sweep_purges_only_expired_records() {
        let store = Arc::new(MemorySignupStore::new(chrono::Duration::milliseconds(20)));
        let mut state = base_state();
        state.signups = store.clone();

        store.put(&lead("old@example.com").validate().unwrap()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;

        let fresh = Arc::new(MemorySignupStore::new(chrono::Duration::minutes(30)));
        fresh.put(&lead("new@example.com").validate().unwrap()).await.unwrap();

        assert_eq!(sweep_expired_signups(&state).await, 1);
        assert!(store.is_empty());

        state.signups = fresh.clone();
        assert_eq!(sweep_expired_signups(&state).await, 0);
        assert_eq!(fresh.len(), 1);

        let events = state.diagnostics.log().list().await.unwrap();
        assert!(events.iter().any(|e| e.message.contains("swept 1 expired")));
    }

    #[tokio::test]
    async fn sweep_failure_is_logged_not_fatal() {
        let mut state = base_state();
        state.signups = Arc::new(FailingSignupStore);
        assert_eq!(sweep_expired_signups(&state).await, 0);
    }
}
