//! HTTP router configuration.
//!
//! This module provides functions to build the Axum router with all
//! necessary routes and middleware.

use std::time::Duration;

use axum::Router;
use axum::routing::{get, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{dispatch_function, health_check, list_functions, register_function};
use crate::state::AppState;

/// Build the main application router.
///
/// Routes:
/// - `GET /` - Liveness message
/// - `PUT /register` - Register a function
/// - `GET /functions` - List registered functions
/// - any other path - Dispatch to the function routed there, if any
///
/// `request_timeout` bounds every request, registration builds included.
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/register", put(register_function))
        .route("/functions", get(list_functions))
        .fallback(dispatch_function)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::response::Response;
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    use crate::handler::LIVENESS_MESSAGE;
    use crate::testing::{script, test_config};

    async fn setup_router(dir: &TempDir) -> Router {
        let state = AppState::new(&test_config(dir)).await.unwrap();
        build_router(state, Duration::from_secs(30))
    }

    fn register_request(name: &str, trigger: &str, body: &str) -> Request<Body> {
        let payload = serde_json::json!({
            "name": name,
            "trigger": trigger,
            "code": STANDARD.encode(script(body)),
        });
        Request::builder()
            .method(Method::PUT)
            .uri("/register")
            .header("content-type", "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;

        let response = app.oneshot(get("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes, LIVENESS_MESSAGE.as_bytes());
    }

    #[tokio::test]
    async fn test_register_then_invoke() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;

        let response = app
            .clone()
            .oneshot(register_request("echo", "http", "echo hi"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"status": "Function registered"})
        );

        let response = app.oneshot(get("/echo")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["message"], "hi\n");
    }

    #[tokio::test]
    async fn test_function_route_accepts_any_method() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;
        app.clone()
            .oneshot(register_request("anymethod", "http", "echo ok"))
            .await
            .unwrap();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/anymethod")
            .body(Body::from("ignored"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_unbound_path_is_not_found() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;

        let response = app.oneshot(get("/nonexistent")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_scheduled_function_has_no_route() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;

        let response = app
            .clone()
            .oneshot(register_request("tick", "*/5 * * * *", "echo tick"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.oneshot(get("/tick")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_register_requires_put() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;

        let response = app.oneshot(get("/register")).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;

        let request = Request::builder()
            .method(Method::PUT)
            .uri("/register")
            .body(Body::from("{ not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["kind"], "validation");
    }

    #[tokio::test]
    async fn test_invalid_name_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;

        let response = app
            .oneshot(register_request("../escape", "http", "echo"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_build_failure_is_not_implemented() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;

        let response = app
            .clone()
            .oneshot(register_request("broken", "http", "BROKEN"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "build");
        assert!(body["error"].as_str().unwrap().contains("syntax error"));

        let response = app.oneshot(get("/broken")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failing_function_is_not_implemented() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;
        app.clone()
            .oneshot(register_request("fails", "http", "echo boom; exit 1"))
            .await
            .unwrap();

        let response = app.oneshot(get("/fails")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "execution");
        assert_eq!(body["output"], "boom\n");
    }

    #[tokio::test]
    async fn test_list_functions() {
        let dir = TempDir::new().unwrap();
        let app = setup_router(&dir).await;
        app.clone()
            .oneshot(register_request("web", "http", "echo web"))
            .await
            .unwrap();
        app.clone()
            .oneshot(register_request("tick", "*/5 * * * *", "echo tick"))
            .await
            .unwrap();

        let response = app.oneshot(get("/functions")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["count"], 2);
        let functions = body["functions"].as_array().unwrap();
        assert_eq!(functions[0]["name"], "tick");
        assert_eq!(functions[0]["binding"]["type"], "schedule");
        assert_eq!(functions[0]["binding"]["expression"], "*/5 * * * *");
        assert_eq!(functions[1]["name"], "web");
        assert_eq!(functions[1]["binding"]["type"], "http");
        assert_eq!(functions[1]["binding"]["route"], "/web");
    }
}
