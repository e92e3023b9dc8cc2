use async_trait::async_trait;
use serde_json::Value;

use crate::models::contact::ResolvedIdentity;
use crate::services::oauth::google::errors::GoogleAuthError;

#[async_trait]
pub trait GoogleOAuthService: Send + Sync {
    async fn exchange_code_for_token(&self, code: &str) -> Result<String, GoogleAuthError>;
    async fn fetch_user_info(&self, access_token: &str) -> Result<Value, GoogleAuthError>;

    /// Turns an authorization code into a verified (email, display name) pair.
    async fn resolve_identity(&self, code: &str) -> Result<ResolvedIdentity, GoogleAuthError> {
        let access_token = self.exchange_code_for_token(code).await?;
        let user_info = self.fetch_user_info(&access_token).await?;
        identity_from_user_info(&user_info)
    }
}

pub fn identity_from_user_info(user_info: &Value) -> Result<ResolvedIdentity, GoogleAuthError> {
    if !user_info.is_object() {
        return Err(GoogleAuthError::InvalidUserInfo);
    }

    let email = user_info["email"]
        .as_str()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or(GoogleAuthError::NoEmailFound)?;

    // v3 userinfo says `email_verified`, v2 says `verified_email`.
    let verified = user_info["email_verified"]
        .as_bool()
        .or_else(|| user_info["verified_email"].as_bool())
        .unwrap_or(true);
    if !verified {
        return Err(GoogleAuthError::UnverifiedEmail);
    }

    let name = match user_info["name"].as_str().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            let first = user_info["given_name"].as_str().unwrap_or("");
            let last = user_info["family_name"].as_str().unwrap_or("");
            let joined = format!("{first} {last}").trim().to_string();
            if joined.is_empty() {
                email.split('@').next().unwrap_or(email).to_string()
            } else {
                joined
            }
        }
    };

    Ok(ResolvedIdentity::new(email, &name))
}
