use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

impl JsonResponse {
    fn error(status: StatusCode, msg: &str, code: Option<&str>) -> impl IntoResponse {
        (
            status,
            Json(JsonResponse {
                status: "error".to_string(),
                success: false,
                message: msg.to_string(),
                code: code.map(str::to_string),
                fields: None,
            }),
        )
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(JsonResponse {
                status: "success".to_string(),
                success: true,
                message: msg.to_string(),
                code: None,
                fields: None,
            }),
        )
    }

    /// `{ "success": true, "data": ... }`
    pub fn data<T: Serialize>(status: StatusCode, data: T) -> impl IntoResponse {
        (status, Json(json!({ "success": true, "data": data })))
    }

    pub fn validation_failed(msg: &str, fields: &[&str]) -> impl IntoResponse {
        (
            StatusCode::BAD_REQUEST,
            Json(JsonResponse {
                status: "error".to_string(),
                success: false,
                message: msg.to_string(),
                code: Some("validation_error".to_string()),
                fields: Some(fields.iter().map(|f| f.to_string()).collect()),
            }),
        )
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::NOT_FOUND, msg, None)
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, msg, None)
    }

    pub fn service_unavailable(msg: &str, code: &str) -> impl IntoResponse {
        Self::error(StatusCode::SERVICE_UNAVAILABLE, msg, Some(code))
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::UNAUTHORIZED, msg, None)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::BAD_REQUEST, msg, None)
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        Self::error(StatusCode::TOO_MANY_REQUESTS, msg, None)
    }

    pub fn redirect_to_login_with_error(frontend_origin: &str, msg: &str) -> impl IntoResponse {
        let redirect_url = format!(
            "{}/login?error={}",
            frontend_origin.trim_end_matches('/'),
            urlencoding::encode(msg)
        );
        Redirect::to(&redirect_url).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use serde_json::{from_slice, Value};

    use crate::responses::JsonResponse;

    #[tokio::test]
    async fn test_success_response() {
        let resp = JsonResponse::success("ok").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert_eq!(json.status, "success");
        assert!(json.success);
        assert_eq!(json.message, "ok");
    }

    #[tokio::test]
    async fn test_validation_failed_lists_fields() {
        let resp = JsonResponse::validation_failed("nope", &["email", "name"]).into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert!(!json.success);
        assert_eq!(json.code.as_deref(), Some("validation_error"));
        assert_eq!(json.fields.unwrap(), vec!["email", "name"]);
    }

    #[tokio::test]
    async fn test_data_envelope() {
        let resp =
            JsonResponse::data(axum::http::StatusCode::CREATED, serde_json::json!({"id": 1}))
                .into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::CREATED);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: Value = from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["id"], 1);
    }

    #[tokio::test]
    async fn test_service_unavailable_carries_code() {
        let resp = JsonResponse::service_unavailable("later", "store_unavailable").into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let json: JsonResponse = from_slice(&body).unwrap();
        assert_eq!(json.code.as_deref(), Some("store_unavailable"));
    }

    #[tokio::test]
    async fn test_redirect_to_login_with_error() {
        let resp =
            JsonResponse::redirect_to_login_with_error("https://example.com/", "token expired")
                .into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::SEE_OTHER);

        if let Some(loc) = resp.headers().get("location") {
            let loc_str = loc.to_str().unwrap();
            assert!(loc_str.starts_with("https://example.com/login?error="));
            assert!(loc_str.contains("token%20expired"));
        } else {
            panic!("Redirect did not contain a location header");
        }
    }
}
