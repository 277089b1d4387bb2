/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use tasklist_api::{app::{build_router, AppState}, config::Config};
/// use tasklist_shared::db::pool::create_pool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(config.pool_config()).await?;
/// let app = build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{json::force_json, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tasklist_shared::{auth::middleware::authenticate, storage::AttachmentStore};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Attachment file area
    pub storage: AttachmentStore,
}

impl AppState {
    /// Creates new application state; attachments live under `config.storage.path`
    pub fn new(db: SqlitePool, config: Config) -> Self {
        let storage = AttachmentStore::new(config.storage.path.clone());
        Self {
            db,
            config: Arc::new(config),
            storage,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Routes
///
/// ```text
/// /
/// ├── GET  /health                      # public
/// ├── POST /register                    # public
/// ├── POST /login                       # public
/// ├── GET  /storage/attachments/<file>  # public, read-only
/// ├── GET|POST /tasks                   # bearer token
/// └── GET|PUT|DELETE /tasks/:id         # bearer token
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, JSON error rewriting, tracing,
/// body size limit. The bearer auth layer wraps only the task routes and runs
/// before any extractor, so a missing token is reported before a missing task.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let task_routes = Router::new()
        .route("/tasks", get(routes::tasks::index).post(routes::tasks::store))
        .route(
            "/tasks/:id",
            get(routes::tasks::show)
                .put(routes::tasks::update)
                .delete(routes::tasks::destroy),
        )
        .route_layer(from_fn_with_state(state.clone(), bearer_auth_layer));

    let files = ServeDir::new(state.storage.directory());

    Router::new()
        .merge(public_routes)
        .merge(task_routes)
        .nest_service("/storage/attachments", files)
        .layer(DefaultBodyLimit::max(state.config.api.max_body_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(from_fn(force_json))
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// CORS configuration; `*` in `CORS_ORIGINS` allows any origin
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Bearer token authentication layer
///
/// Resolves the token to its user and injects [`AuthContext`] into request
/// extensions.
///
/// [`AuthContext`]: tasklist_shared::auth::middleware::AuthContext
async fn bearer_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(&state.db, req.headers()).await?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
