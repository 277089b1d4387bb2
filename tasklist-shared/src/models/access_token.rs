/// Access token model and database operations
///
/// An access token is the opaque bearer credential issued at register and
/// login. A user may hold several tokens at once; none of them expire.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE access_tokens (
///     id BLOB PRIMARY KEY NOT NULL,
///     user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     token_hash TEXT NOT NULL UNIQUE,
///     last_used_at TEXT,
///     created_at TEXT NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tasklist_shared::models::access_token::AccessToken;
/// use sqlx::SqlitePool;
/// use uuid::Uuid;
///
/// # async fn example(pool: SqlitePool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let (record, plaintext) = AccessToken::issue(&pool, user_id).await?;
///
/// // Later, on an incoming request:
/// let resolved = AccessToken::authenticate(&pool, &plaintext).await?;
/// assert_eq!(resolved.map(|t| t.user_id), Some(record.user_id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::token::{generate_token, hash_token};

/// Name recorded for tokens issued by the register and login endpoints
pub const DEFAULT_TOKEN_NAME: &str = "auth_token";

/// Access token record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AccessToken {
    /// Unique token ID
    pub id: Uuid,

    /// User this token authenticates as
    pub user_id: Uuid,

    /// Label for the token
    pub name: String,

    /// SHA-256 hash of the plaintext token
    #[serde(skip_serializing)]
    pub token_hash: String,

    /// When the token last authenticated a request
    pub last_used_at: Option<DateTime<Utc>>,

    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    /// Issues a new token for a user
    ///
    /// Returns the stored record and the plaintext token. The plaintext is
    /// never persisted and cannot be recovered later.
    pub async fn issue(pool: &SqlitePool, user_id: Uuid) -> Result<(Self, String), sqlx::Error> {
        let (plaintext, token_hash) = generate_token();

        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            INSERT INTO access_tokens (id, user_id, name, token_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, user_id, name, token_hash, last_used_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(DEFAULT_TOKEN_NAME)
        .bind(token_hash)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        Ok((token, plaintext))
    }

    /// Resolves a plaintext token to its record
    ///
    /// Touches `last_used_at` when the token is known.
    pub async fn authenticate(pool: &SqlitePool, plaintext: &str) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            UPDATE access_tokens
            SET last_used_at = ?
            WHERE token_hash = ?
            RETURNING id, user_id, name, token_hash, last_used_at, created_at
            "#,
        )
        .bind(Utc::now())
        .bind(hash_token(plaintext))
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }
}
