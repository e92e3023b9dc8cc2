use crate::config::OAuthProviderConfig;
use crate::services::oauth::google::{errors::GoogleAuthError, service::GoogleOAuthService};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

pub struct GoogleOAuthClient {
    pub client: Client,
    pub config: OAuthProviderConfig,
}

#[async_trait]
impl GoogleOAuthService for GoogleOAuthClient {
    async fn exchange_code_for_token(&self, code: &str) -> Result<String, GoogleAuthError> {
        let res = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|err| {
                warn!(?err, "google token request could not be sent");
                GoogleAuthError::TokenExchangeFailed
            })?;

        if !res.status().is_success() {
            warn!(status = %res.status(), "google token request rejected");
            return Err(GoogleAuthError::TokenExchangeFailed);
        }

        let token_json: Value = res
            .json()
            .await
            .map_err(|_| GoogleAuthError::InvalidTokenJson)?;
        token_json["access_token"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or(GoogleAuthError::InvalidTokenJson)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<Value, GoogleAuthError> {
        let res = self
            .client
            .get(&self.config.user_info_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|_| GoogleAuthError::UserInfoFetchFailed)?;

        if !res.status().is_success() {
            return Err(GoogleAuthError::UserInfoFetchFailed);
        }

        res.json()
            .await
            .map_err(|_| GoogleAuthError::InvalidUserInfo)
    }
}
