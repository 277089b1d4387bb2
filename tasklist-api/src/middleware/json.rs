/// JSON error responses for framework rejections
///
/// Errors produced by handlers already render as JSON through `ApiError`.
/// Responses generated elsewhere (unknown routes, wrong methods, body limit
/// hits, missing static files) come back as plain text or empty bodies; this
/// middleware rewrites any such 4xx/5xx response into the same
/// `{error, message}` shape.

use axum::{
    body::to_bytes,
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorResponse;

/// Largest original body kept as the error message
const MAX_MESSAGE_BYTES: usize = 1024;

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

/// Snake-case error code for a status, e.g. `method_not_allowed`
fn error_code(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("error")
        .to_ascii_lowercase()
        .replace(|c: char| !c.is_ascii_alphanumeric(), "_")
}

/// Rewrites non-JSON error responses as JSON
pub async fn force_json(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) || is_json(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let original = to_bytes(body, MAX_MESSAGE_BYTES)
        .await
        .ok()
        .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    let message = original
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Error").to_string());

    tracing::debug!(status = %status, message = %message, "Rewrote framework error as JSON");

    let body = Json(ErrorResponse {
        error: error_code(status),
        message,
        details: None,
    });

    let mut rewritten = (status, body).into_response();

    // Keep headers such as `Allow` on a 405
    parts.headers.remove(header::CONTENT_TYPE);
    parts.headers.remove(header::CONTENT_LENGTH);
    for (name, value) in parts.headers.drain().filter_map(|(n, v)| n.map(|n| (n, v))) {
        rewritten.headers_mut().entry(name).or_insert(value);
    }
    rewritten
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    rewritten
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, middleware::from_fn, routing::get, Router};
    use tower::Service as _;

    fn empty_error(status: StatusCode) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = status;
        response
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app() -> Router {
        Router::new()
            .route("/tasks", get(|| async { "ok" }))
            .route("/teapot", get(|| async { empty_error(StatusCode::IM_A_TEAPOT) }))
            .layer(from_fn(force_json))
    }

    #[test]
    fn test_error_code() {
        assert_eq!(error_code(StatusCode::METHOD_NOT_ALLOWED), "method_not_allowed");
        assert_eq!(error_code(StatusCode::PAYLOAD_TOO_LARGE), "payload_too_large");
    }

    #[tokio::test]
    async fn test_method_not_allowed_becomes_json() {
        let response = app()
            .call(Request::builder().method("PUT").uri("/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(response.headers().get(header::ALLOW).is_some());
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let json = body_json(response).await;
        assert_eq!(json["error"], "method_not_allowed");
        assert_eq!(json["message"], "Method Not Allowed");
    }

    #[tokio::test]
    async fn test_empty_error_body_gets_reason() {
        let response = app()
            .call(Request::builder().uri("/teapot").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        let json = body_json(response).await;
        assert_eq!(json["error"], "i_m_a_teapot");
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let response = app()
            .call(Request::builder().uri("/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"ok");
    }
}
