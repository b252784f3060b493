//! Request handlers.
//!
//! - [`health_check`]: liveness probe
//! - [`register_function`]: validate, build, persist and bind a function
//! - [`list_functions`]: registry listing with live binding state
//! - [`dispatch_function`]: run whatever function is routed on the path

use axum::extract::State;
use axum::http::{Method, Uri};
use axum::response::IntoResponse;
use bytes::Bytes;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use fnhost_common::RuntimeError;
use fnhost_core::FunctionDefinition;

use crate::response::{ApiResponse, error_to_response};
use crate::state::AppState;

/// Liveness message returned by `GET /`.
pub const LIVENESS_MESSAGE: &str = "fnhost is running";

/// Health check handler.
///
/// Returns 200 OK if the server is running.
pub async fn health_check() -> ApiResponse {
    ApiResponse::text(200, LIVENESS_MESSAGE)
}

/// Register a function.
///
/// The body is parsed by hand so that a malformed payload maps to the same
/// JSON error shape as every other failure.
#[instrument(skip(state, body), fields(request_id = %Uuid::new_v4()))]
pub async fn register_function(State(state): State<AppState>, body: Bytes) -> ApiResponse {
    let definition: FunctionDefinition = match serde_json::from_slice(&body) {
        Ok(definition) => definition,
        Err(e) => {
            warn!(error = %e, "Rejected malformed registration payload");
            return error_to_response(&RuntimeError::validation(format!(
                "malformed registration payload: {e}"
            )));
        }
    };

    let name = definition.name.clone();
    info!(function = %name, trigger = %definition.trigger, "Registering function");

    match state.register(definition).await {
        Ok((metadata, binding)) => {
            info!(function = %metadata.name, ?binding, "Registration complete");
            ApiResponse::json(
                201,
                &serde_json::json!({
                    "status": "Function registered",
                }),
            )
        }
        Err(e) => {
            error!(function = %name, error = %e, kind = e.kind(), "Registration failed");
            error_to_response(&e)
        }
    }
}

/// List registered functions.
pub async fn list_functions(State(state): State<AppState>) -> impl IntoResponse {
    let functions: Vec<_> = state
        .registry()
        .list()
        .into_iter()
        .map(|entry| {
            let binding = state.orchestrator().binding(&entry.name);
            serde_json::json!({
                "name": entry.name,
                "trigger": entry.trigger,
                "path": entry.path,
                "registered_at": entry.registered_at,
                "binding": binding,
            })
        })
        .collect();

    axum::Json(serde_json::json!({
        "count": functions.len(),
        "functions": functions,
    }))
}

/// Run the function routed on the request path.
///
/// Any method is accepted. Unbound paths answer 404.
#[instrument(skip(state), fields(path = %uri.path()))]
pub async fn dispatch_function(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> ApiResponse {
    match state.orchestrator().invoke_route(uri.path()).await {
        Ok(invocation) => {
            info!(
                %method,
                invocation_id = %invocation.id,
                duration_ms = invocation.duration.as_millis(),
                "Function invoked"
            );
            ApiResponse::json(
                201,
                &serde_json::json!({
                    "message": invocation.output_lossy(),
                }),
            )
            .with_header("x-invocation-id", &invocation.id.to_string())
        }
        Err(e) if e.is_not_found() => {
            info!(%method, "No function routed");
            error_to_response(&e)
        }
        Err(e) => {
            error!(%method, error = %e, kind = e.kind(), "Function invocation failed");
            error_to_response(&e)
        }
    }
}
