use std::sync::atomic::{AtomicUsize, Ordering};

use super::{errors::GoogleAuthError, service::GoogleOAuthService};

/// Resolves every code to the configured user info.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockGoogleOAuth {
    pub token: String,
    pub user_info: serde_json::Value,
    pub fail_exchange: bool,
    pub exchanges: AtomicUsize,
}

#[allow(dead_code)]
impl MockGoogleOAuth {
    pub fn with_user(email: &str, name: &str) -> Self {
        Self {
            token: "mock-token".into(),
            user_info: serde_json::json!({ "email": email, "name": name, "email_verified": true }),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_exchange: true,
            ..Default::default()
        }
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GoogleOAuthService for MockGoogleOAuth {
    async fn exchange_code_for_token(&self, _code: &str) -> Result<String, GoogleAuthError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if self.fail_exchange {
            return Err(GoogleAuthError::TokenExchangeFailed);
        }
        Ok(self.token.clone())
    }

    async fn fetch_user_info(
        &self,
        _access_token: &str,
    ) -> Result<serde_json::Value, GoogleAuthError> {
        Ok(self.user_info.clone())
    }
}
