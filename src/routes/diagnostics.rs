use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::{responses::JsonResponse, AppState};

pub async fn list_diagnostics(State(app_state): State<AppState>) -> Response {
    match app_state.diagnostics.log().list().await {
        Ok(events) => JsonResponse::data(StatusCode::OK, events).into_response(),
        Err(e) => {
            error!(?e, "failed to list diagnostics");
            JsonResponse::server_error("Failed to fetch diagnostics").into_response()
        }
    }
}

pub async fn clear_diagnostics(State(app_state): State<AppState>) -> Response {
    match app_state.diagnostics.log().clear().await {
        Ok(removed) => Json(json!({"success": true, "removed": removed})).into_response(),
        Err(e) => {
            error!(?e, "failed to clear diagnostics");
            JsonResponse::server_error("Failed to clear diagnostics").into_response()
        }
    }
}
