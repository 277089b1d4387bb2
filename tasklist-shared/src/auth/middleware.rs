/// Bearer token authentication
///
/// Resolves the `Authorization: Bearer <token>` header of a request to the
/// user it authenticates as. The API's auth layer calls [`authenticate`] and
/// inserts the resulting [`AuthContext`] into request extensions; handlers
/// then read it with Axum's `Extension` extractor and hand `auth.user_id` to
/// the model operations explicitly.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use tasklist_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::token::validate_token_format;
use crate::models::access_token::AccessToken;

/// Authenticated caller, added to request extensions by the auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Token the request presented
    pub token_id: Uuid,
}

impl AuthContext {
    /// Creates auth context from a resolved token
    pub fn from_token(token: &AccessToken) -> Self {
        Self {
            user_id: token.user_id,
            token_id: token.id,
        }
    }
}

/// Error type for bearer authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not a bearer token
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token is well-formed but unknown
    #[error("Invalid token")]
    InvalidToken,

    /// Database error while resolving the token
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - `MissingCredentials` if there is no Authorization header
/// - `InvalidFormat` if it is not a bearer token
/// - `InvalidToken` if the token is malformed or unknown
/// - `DatabaseError` if the lookup fails
pub async fn authenticate(pool: &SqlitePool, headers: &HeaderMap) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;

    if !validate_token_format(token) {
        return Err(AuthError::InvalidToken);
    }

    let record = AccessToken::authenticate(pool, token)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::InvalidToken)?;

    tracing::debug!(user_id = %record.user_id, token_id = %record.id, "Request authenticated");

    Ok(AuthContext::from_token(&record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use crate::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
    use crate::models::user::{CreateUser, User};

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers_with("Basic abc")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert_eq!(bearer_token(&headers_with("Bearer tl_abc")).unwrap(), "tl_abc");
    }

    #[tokio::test]
    async fn test_authenticate_resolves_user() {
        let pool = create_pool(DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let user = User::create(
            &pool,
            CreateUser {
                name: "John".to_string(),
                email: "john@galt.com".to_string(),
                password_hash: "hash".to_string(),
            },
        )
        .await
        .unwrap();
        let (record, plaintext) = AccessToken::issue(&pool, user.id).await.unwrap();

        let context = authenticate(&pool, &headers_with(&format!("Bearer {}", plaintext)))
            .await
            .unwrap();
        assert_eq!(context.user_id, user.id);
        assert_eq!(context.token_id, record.id);

        let err = authenticate(&pool, &headers_with("Bearer not-a-token")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
