use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use reqwest::Url;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::{
    contact::{ContactRecord, ResolvedIdentity},
    signup::SignupIntent,
};
use crate::routes::auth::claims::Claims;
use crate::services::oauth::google::errors::GoogleAuthError;
use crate::utils::{
    intent::{generate_nonce, sign_intent, verify_intent},
    jwt::create_jwt,
};
use crate::{responses::JsonResponse, AppState};

pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const SESSION_COOKIE: &str = "session";
const SESSION_TTL_HOURS: i64 = 24 * 30;
/// What the end user sees for any identity failure; details go to diagnostics.
const SIGN_IN_FAILED: &str = "Sign-in failed. Please try again.";
const MAX_INTENT_VALUE_LEN: usize = 64;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginParams {
    pub plan: Option<String>,
    pub billing_cycle: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// How the pending-signup half of a callback ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeOutcome {
    /// Stored answers were merged and accepted by the CRM.
    Forwarded,
    /// Stored answers were merged but the CRM push failed.
    ForwardFailed,
    /// Nothing pending (or the store was unreachable); identity-only session.
    IdentityOnly,
}

fn intent_value(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v.len() <= MAX_INTENT_VALUE_LEN)
}

pub async fn google_login(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<LoginParams>,
) -> Response {
    let google = &app_state.config.google;
    let mut url = match Url::parse(&google.authorize_url) {
        Ok(url) => url,
        Err(err) => {
            error!(?err, "invalid GOOGLE_ACCOUNTS_OAUTH_API_BASE");
            return JsonResponse::server_error("Sign-in is temporarily unavailable")
                .into_response();
        }
    };

    let intent = SignupIntent {
        plan: intent_value(params.plan),
        billing_cycle: intent_value(params.billing_cycle),
        source: intent_value(params.source),
    };
    let nonce = generate_nonce();
    let state = sign_intent(
        &app_state.config.intent_secret,
        &nonce,
        &intent,
        chrono::Utc::now().timestamp(),
    );

    url.query_pairs_mut()
        .append_pair("client_id", &google.client_id)
        .append_pair("redirect_uri", &google.redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", "email profile")
        .append_pair("state", &state);

    let oauth_state_cookie = Cookie::build((OAUTH_STATE_COOKIE, nonce))
        .http_only(true)
        .secure(app_state.config.auth_cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::minutes(10))
        .build();

    (jar.add(oauth_state_cookie), Redirect::to(url.as_str())).into_response()
}

/// Consumes whatever the lead submitted before signing in and forwards the
/// merged record. Storage and CRM failures are absorbed here.
pub async fn bridge_signup(
    app_state: &AppState,
    identity: &ResolvedIdentity,
    intent: &SignupIntent,
) -> BridgeOutcome {
    let diagnostics = &app_state.diagnostics;
    let email = identity.email.as_str();

    let pending = match app_state.signups.consume_and_remove(email).await {
        Ok(Some(pending)) => {
            diagnostics
                .info(format!("pending signup found for {email}"))
                .await;
            pending
        }
        Ok(None) => {
            diagnostics
                .info(format!(
                    "no pending signup for {email}; continuing with identity only"
                ))
                .await;
            return BridgeOutcome::IdentityOnly;
        }
        Err(err) => {
            diagnostics
                .warn(format!(
                    "store unavailable while consuming {email}: {err}; continuing with identity only"
                ))
                .await;
            return BridgeOutcome::IdentityOnly;
        }
    };

    let contact = ContactRecord::merge(identity, &pending, intent);
    match app_state.crm.push_contact(&contact).await {
        Ok(()) => {
            diagnostics
                .info(format!("forwarded {email} to CRM (signup {})", pending.id))
                .await;
            BridgeOutcome::Forwarded
        }
        Err(err) => {
            diagnostics
                .error(format!(
                    "CRM forward failed for {email} (signup {}, name={:?}, business={:?}, plan={:?}, billing={:?}, source={:?}): {err}",
                    pending.id,
                    contact.name,
                    contact.business,
                    contact.plan,
                    contact.billing_cycle,
                    contact.source,
                ))
                .await;
            match app_state.signups.restore(&pending).await {
                Ok(true) => {
                    diagnostics
                        .warn(format!(
                            "pending signup for {email} restored for a later attempt"
                        ))
                        .await;
                }
                Ok(false) => {
                    diagnostics
                        .warn(format!(
                            "pending signup for {email} not restored (superseded or expired)"
                        ))
                        .await;
                }
                Err(restore_err) => {
                    diagnostics
                        .error(format!(
                            "could not restore pending signup for {email}: {restore_err}"
                        ))
                        .await;
                }
            }
            BridgeOutcome::ForwardFailed
        }
    }
}

async fn identity_failed(app_state: &AppState, reason: &str) -> Response {
    app_state
        .diagnostics
        .warn(format!("oauth callback rejected: {reason}"))
        .await;
    let secure_cookie = app_state.config.auth_cookie_secure;
    let clear_state_cookie = Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path("/")
        .secure(secure_cookie)
        .max_age(time::Duration::seconds(0))
        .build();
    (
        CookieJar::new().add(clear_state_cookie),
        JsonResponse::redirect_to_login_with_error(
            &app_state.config.frontend_origin,
            SIGN_IN_FAILED,
        ),
    )
        .into_response()
}

fn destination_url(frontend_origin: &str, intent: &SignupIntent) -> String {
    let base = format!("{}/dashboard", frontend_origin.trim_end_matches('/'));
    let Some(plan) = intent.plan.as_deref() else {
        return base;
    };
    let mut query = format!("plan={}", urlencoding::encode(plan));
    if let Some(cycle) = intent.billing_cycle.as_deref() {
        query.push_str(&format!("&billingCycle={}", urlencoding::encode(cycle)));
    }
    format!("{base}?{query}")
}

pub async fn google_callback(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(provider_error) = params.error.as_deref() {
        return identity_failed(&app_state, &format!("provider returned '{provider_error}'"))
            .await;
    }

    let Some(code) = params.code.as_deref() else {
        return identity_failed(&app_state, "missing 'code' param").await;
    };
    let Some(state_param) = params.state.as_deref() else {
        return identity_failed(&app_state, "missing 'state' param").await;
    };
    let Some(expected_nonce) = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string()) else {
        return identity_failed(&app_state, &GoogleAuthError::MissingStateCookie.to_string())
            .await;
    };

    let intent = match verify_intent(
        &app_state.config.intent_secret,
        state_param,
        &expected_nonce,
        chrono::Utc::now().timestamp(),
    ) {
        Ok(intent) => intent,
        Err(err) => {
            return identity_failed(
                &app_state,
                &format!("{}: {err}", GoogleAuthError::InvalidState),
            )
            .await
        }
    };

    let identity = match app_state.google_oauth.resolve_identity(code).await {
        Ok(identity) => identity,
        Err(err) => return identity_failed(&app_state, &err.to_string()).await,
    };
    info!(email = %identity.email, "oauth identity resolved");

    // Runs on its own task: once a record is consumed, a dropped request must
    // not stop it from being forwarded or put back.
    let bridge = {
        let app_state = app_state.clone();
        let identity = identity.clone();
        let intent = intent.clone();
        tokio::spawn(async move { bridge_signup(&app_state, &identity, &intent).await })
    };
    let outcome = match bridge.await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(?err, email = %identity.email, "signup bridge task failed");
            BridgeOutcome::IdentityOnly
        }
    };

    let session_ttl_hours = SESSION_TTL_HOURS;
    let claims = Claims {
        id: Uuid::new_v5(&Uuid::NAMESPACE_OID, identity.email.as_bytes()).to_string(),
        email: identity.email.clone(),
        name: identity.name.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(session_ttl_hours)).timestamp()
            as usize,
        plan: intent.plan.clone(),
        iss: String::new(),
        aud: String::new(),
    };

    let token = match create_jwt(
        claims,
        &app_state.jwt_keys,
        &app_state.config.jwt_issuer,
        &app_state.config.jwt_audience,
    ) {
        Ok(token) => token,
        Err(err) => {
            error!(?err, email = %identity.email, "failed to sign session token");
            return identity_failed(&app_state, "session token could not be issued").await;
        }
    };

    info!(email = %identity.email, ?outcome, "session established");

    let secure_cookie = app_state.config.auth_cookie_secure;
    let session_cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(secure_cookie)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::hours(session_ttl_hours))
        .build();
    let clear_state_cookie = Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path("/")
        .secure(secure_cookie)
        .max_age(time::Duration::seconds(0))
        .build();

    let jar = CookieJar::new().add(session_cookie).add(clear_state_cookie);
    (
        jar,
        Redirect::to(&destination_url(&app_state.config.frontend_origin, &intent)),
    )
        .into_response()
}
