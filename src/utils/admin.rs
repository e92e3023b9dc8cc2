use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{responses::JsonResponse, state::AppState};

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Gates operator routes when `ADMIN_API_TOKEN` is configured; passes through otherwise.
pub async fn require_admin_token(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.admin_api_token.as_deref() else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if subtle::ConstantTimeEq::ct_eq(expected.as_bytes(), provided.as_bytes()).unwrap_u8() == 1u8 {
        next.run(req).await
    } else {
        JsonResponse::unauthorized("Missing or invalid admin token").into_response()
    }
}
