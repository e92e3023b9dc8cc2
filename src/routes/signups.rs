use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use crate::{
    db::signup_repository::StoreError,
    models::signup::{normalize_email, IntakePayload},
    responses::JsonResponse,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

fn store_unavailable(err: &StoreError) -> Response {
    error!(%err, "pending signup store unavailable");
    JsonResponse::service_unavailable(
        "We couldn't save your details right now. Please try again shortly.",
        "store_unavailable",
    )
    .into_response()
}

fn email_param(query: EmailQuery) -> Option<String> {
    query
        .email
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty())
}

/// Accepts the pre-sign-in form. A second submission for the same email
/// replaces the first.
pub async fn handle_intake(
    State(state): State<AppState>,
    Json(payload): Json<IntakePayload>,
) -> Response {
    let new = match payload.validate() {
        Ok(new) => new,
        Err(err) => {
            return JsonResponse::validation_failed(&err.to_string(), &err.fields).into_response()
        }
    };

    match state.signups.put(&new).await {
        Ok(stored) => {
            state
                .diagnostics
                .info(format!(
                    "stored pending signup {} for {} (expires {})",
                    stored.id,
                    stored.email,
                    stored.expires_at.to_rfc3339()
                ))
                .await;
            JsonResponse::data(StatusCode::CREATED, &stored).into_response()
        }
        Err(err) => {
            state
                .diagnostics
                .error(format!("failed to store pending signup for {}: {err}", new.email))
                .await;
            store_unavailable(&err)
        }
    }
}

pub async fn get_signup(State(state): State<AppState>, Query(query): Query<EmailQuery>) -> Response {
    let Some(email) = email_param(query) else {
        return JsonResponse::validation_failed("Missing or invalid fields: email", &["email"])
            .into_response();
    };

    match state.signups.get(&email).await {
        Ok(Some(signup)) => JsonResponse::data(StatusCode::OK, &signup).into_response(),
        Ok(None) => JsonResponse::not_found("No pending signup for that email").into_response(),
        Err(err) => store_unavailable(&err),
    }
}

pub async fn delete_signup_by_id(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.signups.delete_by_id(id).await {
        Ok(true) => {
            state
                .diagnostics
                .info(format!("pending signup {id} deleted by operator"))
                .await;
            JsonResponse::success("Pending signup deleted").into_response()
        }
        Ok(false) => JsonResponse::not_found("Pending signup not found").into_response(),
        Err(err) => store_unavailable(&err),
    }
}

pub async fn delete_signup_by_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Response {
    let Some(email) = email_param(query) else {
        return JsonResponse::validation_failed("Missing or invalid fields: email", &["email"])
            .into_response();
    };

    match state.signups.delete_by_email(&email).await {
        Ok(true) => {
            state
                .diagnostics
                .info(format!("pending signup for {email} deleted by operator"))
                .await;
            JsonResponse::success("Pending signup deleted").into_response()
        }
        Ok(false) => JsonResponse::not_found("Pending signup not found").into_response(),
        Err(err) => store_unavailable(&err),
    }
}
