pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod response;
pub mod router;

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::api::routes::create_router;
    use crate::api::test_support::test_state;

    const KEY: &str = "test-key";

    async fn app() -> (axum::Router, tempfile::TempDir) {
        let (state, dir) = test_state(vec![KEY.to_string()]).await;
        (create_router(state), dir)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn authed(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {KEY}"));
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn protected_route_requires_auth() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/scopes/acme/search")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query":"hours"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "unauthorized");
    }

    #[tokio::test]
    async fn health_is_public() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "ok");
        assert_eq!(json["data"]["database"]["dimensions"], 8);
        assert_eq!(json["data"]["llm"]["resolutionMode"], "lexical");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn openapi_json_is_public_and_lists_scope_routes() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let version = json["openapi"]
            .as_str()
            .expect("openapi field should be a string");
        assert!(version.starts_with('3'));
        let paths = json["paths"].as_object().expect("paths object");
        assert!(paths.contains_key("/api/v1/scopes/{scopeId}/memories:update"));
        assert!(paths.contains_key("/api/v1/scopes/{scopeId}/conflicts"));
    }

    #[tokio::test]
    async fn summary_of_empty_scope_lists_every_type() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(authed("GET", "/api/v1/scopes/acme/summary", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["scopeId"], "acme");
        assert_eq!(json["data"]["total"], 0);
        for ty in ["conversation", "faq", "knowledge", "example", "document"] {
            assert_eq!(json["data"]["byType"][ty], 0, "missing {ty}");
        }
    }

    #[tokio::test]
    async fn invalid_scope_is_rejected() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(authed("GET", "/api/v1/scopes/acme%2F..%2Fother/summary", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "invalid_request");
        assert!(json.get("data").is_none());
    }

    #[tokio::test]
    async fn conflicts_reject_out_of_range_threshold() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(authed(
                "GET",
                "/api/v1/scopes/acme/conflicts?threshold=1.5",
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn conflicts_of_empty_scope_are_empty() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(authed("GET", "/api/v1/scopes/acme/conflicts", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["groups"], serde_json::json!([]));
        assert_eq!(json["meta"]["total"], 0);
    }

    #[tokio::test]
    async fn empty_search_query_is_invalid() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(authed(
                "POST",
                "/api/v1/scopes/acme/search",
                Some(r#"{"query":"   "}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_for_foreign_scope_is_a_violation() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(authed(
                "POST",
                "/api/v1/scopes/acme/memories:update",
                Some(r#"{"candidate":{"scopeId":"globex","text":"We open at 8am"}}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "scope_violation");
        assert!(!json["error"]["message"].as_str().unwrap().contains("globex"));
    }

    #[tokio::test]
    async fn unreachable_embedder_maps_to_503() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(authed(
                "POST",
                "/api/v1/scopes/acme/conversations",
                Some(r#"{"segments":[{"text":"Customer: do you open on Sunday?"}]}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "unavailable");
    }

    #[tokio::test]
    async fn delete_of_empty_scope_reports_zero() {
        let (app, _dir) = app().await;

        let response = app
            .oneshot(authed("DELETE", "/api/v1/scopes/acme", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["deleted"], 0);
    }
}
