use crate::config::Config;
use crate::db::signup_repository::SignupStore;
use crate::services::{
    crm::CrmConnector, diagnostics::Diagnostics, oauth::google::service::GoogleOAuthService,
};
use crate::utils::jwt::JwtKeys;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub signups: Arc<dyn SignupStore>,
    pub diagnostics: Diagnostics,
    pub google_oauth: Arc<dyn GoogleOAuthService>,
    pub crm: Arc<dyn CrmConnector>,
    pub config: Arc<Config>,
    pub jwt_keys: Arc<JwtKeys>,
}
