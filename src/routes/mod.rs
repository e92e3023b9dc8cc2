pub mod auth;
pub mod diagnostics;
pub mod signups;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::{utils::admin::require_admin_token, AppState};

/// `/api/signups`: intake is public, lookups and deletes are operator-only.
pub fn signup_routes(state: AppState) -> Router<AppState> {
    let operator = Router::new()
        .route(
            "/",
            get(signups::get_signup).delete(signups::delete_signup_by_email),
        )
        .route("/{id}", delete(signups::delete_signup_by_id))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token));

    Router::new()
        .route("/", post(signups::handle_intake))
        .merge(operator)
}

/// `/api/auth`
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/google-login", get(auth::google_login))
        .route("/google-callback", get(auth::google_callback))
}

/// `/api/diagnostics`
pub fn diagnostics_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(diagnostics::list_diagnostics).delete(diagnostics::clear_diagnostics),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}
