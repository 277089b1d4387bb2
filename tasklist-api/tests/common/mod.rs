//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - In-memory database with migrations applied
//! - Temporary attachment storage
//! - A registered user and bearer token
//! - Request builders for JSON and multipart bodies

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tasklist_api::app::{build_router, AppState};
use tasklist_api::config::{ApiConfig, Config, DatabaseConfig, StorageConfig, DEFAULT_MAX_BODY_BYTES};
use tasklist_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig as PoolConfig}};
use tasklist_shared::storage::AttachmentStore;
use tempfile::TempDir;
use tower::Service as _;

pub const MULTIPART_BOUNDARY: &str = "tasklist-test-boundary";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: SqlitePool,
    pub app: Router,
    pub storage: AttachmentStore,
    pub token: String,

    // Keeps the storage directory alive for the test
    _dir: TempDir,
}

impl TestContext {
    /// Creates a new context with a fresh database, empty storage and one
    /// registered user
    pub async fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;

        let db = create_pool(PoolConfig::in_memory()).await?;
        run_migrations(&db).await?;

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            storage: StorageConfig {
                path: dir.path().to_path_buf(),
            },
        };

        let state = AppState::new(db.clone(), config);
        state.storage.init().await?;
        let storage = state.storage.clone();
        let app = build_router(state);

        let mut ctx = TestContext {
            db,
            app,
            storage,
            token: String::new(),
            _dir: dir,
        };

        ctx.token = ctx.register("John", "john@galt.com", "qwerty123").await?;
        Ok(ctx)
    }

    /// Registers a user and returns their token
    pub async fn register(&self, name: &str, email: &str, password: &str) -> anyhow::Result<String> {
        let response = self
            .send(json_request(
                "POST",
                "/register",
                None,
                serde_json::json!({ "name": name, "email": email, "password": password }),
            ))
            .await;

        let (status, body) = read_json(response).await;
        anyhow::ensure!(status == StatusCode::OK, "register failed: {} {}", status, body);

        body["access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no access_token in {}", body))
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().call(request).await.unwrap()
    }

    /// Sends a request and decodes the JSON response
    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        read_json(self.send(request).await).await
    }

    /// Authenticated JSON request
    pub fn json(&self, method: &str, uri: &str, body: Value) -> Request<Body> {
        json_request(method, uri, Some(&self.auth_header()), body)
    }

    /// Authenticated request without a body
    pub fn empty(&self, method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, self.auth_header())
            .body(Body::empty())
            .unwrap()
    }

    /// Authenticated multipart request
    pub fn multipart(&self, method: &str, uri: &str, parts: &[Part]) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, self.auth_header())
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    /// Creates a task with JSON and returns its JSON
    pub async fn create_task(&self, title: &str) -> Value {
        let (status, body) = self
            .send_json(self.json("POST", "/tasks", serde_json::json!({ "title": title })))
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {}", body);
        body
    }

    /// Path of a stored attachment
    pub fn attachment_path(&self, filename: &str) -> PathBuf {
        self.storage.path_for(filename).unwrap()
    }
}

/// JSON request with optional authorization header
pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

/// Reads a response as JSON; an empty body reads as `Value::Null`
pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    if bytes.is_empty() {
        return (status, Value::Null);
    }

    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes)));
    (status, body)
}

/// One multipart form part
pub enum Part {
    Text { name: String, value: String },
    File { name: String, filename: String, content: Vec<u8> },
}

impl Part {
    pub fn text(name: &str, value: impl Into<String>) -> Self {
        Part::Text {
            name: name.to_string(),
            value: value.into(),
        }
    }

    pub fn file(name: &str, filename: &str, content: &[u8]) -> Self {
        Part::File {
            name: name.to_string(),
            filename: filename.to_string(),
            content: content.to_vec(),
        }
    }
}

/// Encodes parts as a `multipart/form-data` body
pub fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        match part {
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File { name, filename, content } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}
