/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Registration
/// - Login
///
/// Both return a freshly issued opaque bearer token. Every login issues a new
/// token; earlier tokens stay valid.
///
/// # Endpoints
///
/// - `POST /register` - Register new user
/// - `POST /login` - Login and get a token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidJson,
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tasklist_shared::{
    auth::{password, token::TOKEN_TYPE},
    models::{
        access_token::AccessToken,
        user::{CreateUser, User},
    },
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Generic login failure, identical for unknown email and wrong password
const INVALID_LOGIN: &str = "Invalid login details";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(
        required(message = "The name field is required."),
        length(min = 1, max = 255, message = "The name field must be between 1 and 255 characters.")
    )]
    pub name: Option<String>,

    /// Email address
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address."),
        length(max = 255, message = "The email field must not be greater than 255 characters.")
    )]
    pub email: Option<String>,

    /// Plaintext password
    #[validate(
        required(message = "The password field is required."),
        length(min = 8, message = "The password field must be at least 8 characters.")
    )]
    pub password: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address.")
    )]
    pub email: Option<String>,

    #[validate(required(message = "The password field is required."))]
    pub password: Option<String>,
}

/// Token response for register and login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque bearer token, shown only once
    pub access_token: String,

    /// Always "Bearer"
    pub token_type: String,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
        }
    }
}

/// Issues a token for a user and wraps it in the response body
async fn issue_token(state: &AppState, user_id: Uuid) -> ApiResult<Json<TokenResponse>> {
    let (record, plaintext) = AccessToken::issue(&state.db, user_id).await?;
    info!(user_id = %user_id, token_id = %record.id, "Issued access token");

    Ok(Json(TokenResponse::bearer(plaintext)))
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /register
/// Content-Type: application/json
///
/// {
///   "name": "John Galt",
///   "email": "john@galt.com",
///   "password": "qwerty123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "access_token": "tl_...",
///   "token_type": "Bearer"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed or email already taken
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let name = req.name.unwrap_or_default();
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    if User::email_exists(&state.db, &email).await? {
        return Err(ApiError::validation("email", "The email has already been taken."));
    }

    let password_hash = password::hash_password(&password)?;

    // A concurrent registration can still hit the unique index; ApiError maps it to 422
    let user = User::create(
        &state.db,
        CreateUser {
            name,
            email,
            password_hash,
        },
    )
    .await?;

    info!(user_id = %user.id, "Registered user");

    issue_token(&state, user.id).await
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/json
///
/// {
///   "email": "john@galt.com",
///   "password": "qwerty123"
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `422 Unprocessable Entity`: Missing or malformed fields
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let email = req.email.unwrap_or_default();
    let password = req.password.unwrap_or_default();

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_LOGIN.to_string()))?;

    if !password::verify_password(&password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(INVALID_LOGIN.to_string()));
    }

    issue_token(&state, user.id).await
}
