/// Registration, login and bearer token tests

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{json_request, TestContext};
use serde_json::json;

fn fields(body: &serde_json::Value) -> Vec<String> {
    body["details"]
        .as_array()
        .map(|details| {
            details
                .iter()
                .filter_map(|d| d["field"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_register_returns_bearer_token() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send_json(json_request(
            "POST",
            "/register",
            None,
            json!({ "name": "Dagny", "email": "dagny@taggart.com", "password": "rearden1" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    let token = body["access_token"].as_str().unwrap();
    assert!(token.starts_with("tl_"));
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send_json(json_request(
            "POST",
            "/register",
            None,
            json!({ "name": "Other John", "email": "john@galt.com", "password": "qwerty123" }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(fields(&body), vec!["email"]);
}

#[tokio::test]
async fn test_register_short_password() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send_json(json_request(
            "POST",
            "/register",
            None,
            json!({ "name": "Hank", "email": "hank@rearden.com", "password": "short" }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(fields(&body), vec!["password"]);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send_json(json_request("POST", "/register", None, json!({})))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields = fields(&body);
    for field in ["email", "name", "password"] {
        assert!(fields.contains(&field.to_string()), "missing {} in {:?}", field, fields);
    }
}

#[tokio::test]
async fn test_login_issues_working_token() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx
        .send_json(json_request(
            "POST",
            "/login",
            None,
            json!({ "email": "john@galt.com", "password": "qwerty123" }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap();
    assert_ne!(token, ctx.token);

    let request = Request::builder()
        .uri("/tasks")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = ctx.send_json(request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let ctx = TestContext::new().await.unwrap();

    for (email, password) in [("john@galt.com", "wrong-password"), ("nobody@galt.com", "qwerty123")] {
        let (status, body) = ctx
            .send_json(json_request(
                "POST",
                "/login",
                None,
                json!({ "email": email, "password": password }),
            ))
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid login details");
    }
}

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder().uri("/tasks").body(Body::empty()).unwrap();
    let (status, body) = ctx.send_json(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthenticated.");
}

#[tokio::test]
async fn test_invalid_token_is_unauthenticated() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .uri("/tasks")
        .header(header::AUTHORIZATION, "Bearer tl_notarealtoken")
        .body(Body::empty())
        .unwrap();
    let (status, _) = ctx.send_json(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_checked_before_task_lookup() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .uri("/tasks/00000000-0000-0000-0000-000000000000")
        .body(Body::empty())
        .unwrap();
    let (status, _) = ctx.send_json(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
