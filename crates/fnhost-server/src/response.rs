//! HTTP response helpers.
//!
//! Every handler answers with a JSON body except the liveness probe, which
//! answers in plain text. [`ApiResponse`] is the common shape, and
//! [`error_to_response`] is the single place where [`RuntimeError`] kinds
//! become status codes.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

use fnhost_common::RuntimeError;

/// Response status, headers and body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers as key-value pairs
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Create a simple text response.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![(
                "content-type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            body: body.as_bytes().to_vec(),
        }
    }

    /// Create a JSON response.
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    /// Add a header to the response.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Convert to Axum response.
    pub fn into_axum_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                response.headers_mut().append(name, value);
            }
        }

        response
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> axum::response::Response {
        self.into_axum_response()
    }
}

/// Map a [`RuntimeError`] to its HTTP response.
///
/// Validation → 400, unknown function → 404, anything else → 501. The body
/// always carries `error` and `kind`; execution failures add the captured
/// `output`.
pub fn error_to_response(error: &RuntimeError) -> ApiResponse {
    let status = match error {
        RuntimeError::Validation { .. } => 400,
        RuntimeError::FunctionNotFound { .. } => 404,
        _ => 501,
    };

    let mut body = serde_json::json!({
        "error": error.to_string(),
        "kind": error.kind(),
    });
    if let RuntimeError::Execution { output, .. } = error {
        body["output"] = serde_json::Value::String(output.clone());
    }

    ApiResponse::json(status, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnhost_common::Operation;

    fn body(resp: &ApiResponse) -> serde_json::Value {
        serde_json::from_slice(&resp.body).unwrap()
    }

    #[test]
    fn test_text_response() {
        let resp = ApiResponse::text(200, "Hello, World!");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"Hello, World!");
        assert_eq!(
            resp.headers[0],
            (
                "content-type".to_string(),
                "text/plain; charset=utf-8".to_string()
            )
        );
    }

    #[test]
    fn test_json_response() {
        let resp = ApiResponse::json(201, &serde_json::json!({"status": "Function registered"}));
        assert_eq!(resp.status, 201);
        assert_eq!(body(&resp)["status"], "Function registered");
    }

    #[test]
    fn test_with_header() {
        let resp = ApiResponse::text(200, "OK").with_header("X-Invocation-Id", "123");

        assert_eq!(resp.headers.len(), 2);
        let axum_resp = resp.into_axum_response();
        assert_eq!(axum_resp.headers()["x-invocation-id"], "123");
    }

    #[test]
    fn test_into_axum_response_status() {
        let resp = error_to_response(&RuntimeError::build("x", "nope")).into_axum_response();
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn test_validation_is_bad_request() {
        let resp = error_to_response(&RuntimeError::validation("bad name"));
        assert_eq!(resp.status, 400);
        assert_eq!(body(&resp)["kind"], "validation");
    }

    #[test]
    fn test_not_found() {
        let resp = error_to_response(&RuntimeError::function_not_found("ghost"));
        assert_eq!(resp.status, 404);
    }

    #[test]
    fn test_failures_are_not_implemented() {
        let errors = [
            RuntimeError::build("x", "syntax error"),
            RuntimeError::storage("disk full"),
            RuntimeError::timeout(Operation::Execution, "x", 100),
        ];
        for err in &errors {
            let resp = error_to_response(err);
            assert_eq!(resp.status, 501);
            assert_eq!(body(&resp)["kind"], err.kind());
        }
    }

    #[test]
    fn test_execution_error_carries_output() {
        let resp = error_to_response(&RuntimeError::execution("x", "exit status 1", "boom\n"));
        assert_eq!(resp.status, 501);
        assert_eq!(body(&resp)["output"], "boom\n");
    }
}
