//! # V1 API Key Authentication Middleware
//!
//! Protects every scope route with Bearer token authentication. Tokens are
//! checked against `FACTBASE_API_KEYS`. `/health`, `/openapi.json` and
//! `/docs` stay public.
//!
//! Errors are returned in the v1 `ApiResponse` envelope so clients handle
//! auth failures like any other error.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::state::AppState;

use super::response::{ApiResponse, ErrorCode};

/// Axum middleware that enforces Bearer token authentication.
///
/// - No keys configured: every protected route answers 401. The server
///   still starts so health checks keep working.
/// - Missing or non-Bearer `Authorization` header: 401.
/// - Unknown token: 401.
pub async fn v1_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let keys = &state.config.server.api_keys;
    if keys.is_empty() {
        return ApiResponse::<()>::error(
            ErrorCode::Unauthorized,
            "API keys not configured. Set FACTBASE_API_KEYS to enable access.",
        )
        .into_response();
    }

    let auth_header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(token) => token.trim(),
            None => {
                return ApiResponse::<()>::error(
                    ErrorCode::Unauthorized,
                    "Invalid authorization header format. Expected: Bearer <token>",
                )
                .into_response();
            }
        },
        None => {
            return ApiResponse::<()>::error(
                ErrorCode::Unauthorized,
                "Missing authorization header",
            )
            .into_response();
        }
    };

    if keys.iter().any(|k| k == token) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "Rejected request with unknown API key");
        ApiResponse::<()>::error(ErrorCode::Unauthorized, "Invalid API key").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::test_state;
    use axum::http::StatusCode;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn build_test_app(api_keys: Vec<String>) -> (Router, tempfile::TempDir) {
        let (state, dir) = test_state(api_keys).await;

        async fn protected_handler() -> &'static str {
            "protected"
        }

        let protected_routes = Router::new()
            .route("/protected", get(protected_handler))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                v1_auth_middleware,
            ));

        let app = Router::new()
            .route("/open", get(|| async { "open" }))
            .merge(protected_routes)
            .with_state(state);
        (app, dir)
    }

    async fn parse_error_body(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    fn get_request(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_when_no_keys_configured() {
        let (app, _dir) = build_test_app(vec![]).await;

        let response = app.oneshot(get_request("/protected", None)).await.unwrap();

        let (status, json) = parse_error_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "unauthorized");
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("FACTBASE_API_KEYS"));
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn test_allows_valid_key() {
        let (app, _dir) = build_test_app(vec!["k1".to_string(), "k2".to_string()]).await;

        let response = app
            .oneshot(get_request("/protected", Some("Bearer k2")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejects_invalid_key() {
        let (app, _dir) = build_test_app(vec!["k1".to_string()]).await;

        let response = app
            .oneshot(get_request("/protected", Some("Bearer wrong")))
            .await
            .unwrap();

        let (status, json) = parse_error_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "Invalid API key");
    }

    #[tokio::test]
    async fn test_rejects_non_bearer_scheme() {
        let (app, _dir) = build_test_app(vec!["k1".to_string()]).await;

        let response = app
            .oneshot(get_request("/protected", Some("Basic azE6")))
            .await
            .unwrap();

        let (status, json) = parse_error_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Bearer"));
    }

    #[tokio::test]
    async fn test_rejects_missing_header() {
        let (app, _dir) = build_test_app(vec!["k1".to_string()]).await;

        let response = app.oneshot(get_request("/protected", None)).await.unwrap();

        let (status, json) = parse_error_body(response).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "Missing authorization header");
    }

    #[tokio::test]
    async fn test_unlayered_routes_stay_open() {
        let (app, _dir) = build_test_app(vec!["k1".to_string()]).await;

        let response = app.oneshot(get_request("/open", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
