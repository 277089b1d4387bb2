/// Opaque bearer token utilities
///
/// Tokens are random strings handed to a client once, at register or login.
/// Only their SHA-256 hash is persisted (see `models::access_token`).
///
/// # Token Format
///
/// `tl_` followed by 40 random alphanumeric characters (43 chars total).
///
/// # Example
///
/// ```
/// use tasklist_shared::auth::token::{generate_token, hash_token, validate_token_format};
///
/// let (token, hash) = generate_token();
/// assert!(token.starts_with("tl_"));
/// assert!(validate_token_format(&token));
/// assert_eq!(hash_token(&token), hash);
/// ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of the random part of a token (characters)
const TOKEN_RANDOM_LENGTH: usize = 40;

/// Token prefix
const TOKEN_PREFIX: &str = "tl_";

/// Total length of a token (prefix + random)
pub const TOKEN_LENGTH: usize = TOKEN_PREFIX.len() + TOKEN_RANDOM_LENGTH;

/// Label returned to clients next to every issued token
pub const TOKEN_TYPE: &str = "Bearer";

/// Generates a new token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hash)
pub fn generate_token() -> (String, String) {
    let random_part = generate_random_string(TOKEN_RANDOM_LENGTH);
    let token = format!("{}{}", TOKEN_PREFIX, random_part);
    let hash = hash_token(&token);

    (token, hash)
}

/// Generates a random base62 string
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hashes a token using SHA-256
///
/// # Returns
///
/// Hex-encoded SHA-256 hash (64 characters)
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Validates token format
///
/// Lets the auth layer reject garbage without touching the database.
pub fn validate_token_format(token: &str) -> bool {
    if token.len() != TOKEN_LENGTH {
        return false;
    }

    match token.strip_prefix(TOKEN_PREFIX) {
        Some(random_part) => random_part.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}
