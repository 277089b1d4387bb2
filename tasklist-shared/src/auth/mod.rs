/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`token`]: Opaque bearer token generation and hashing
/// - [`middleware`]: Resolving a request's bearer token to an [`middleware::AuthContext`]
///
/// # Example
///
/// ```
/// use tasklist_shared::auth::password::{hash_password, verify_password};
/// use tasklist_shared::auth::token::generate_token;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let (token, token_hash) = generate_token();
/// assert_ne!(token, token_hash);
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod token;
pub mod middleware;
