/// Database models for tasklist
///
/// Each model owns its CRUD operations and takes the pool explicitly.
///
/// # Models
///
/// - `user`: Registered accounts
/// - `access_token`: Opaque bearer tokens issued at register and login
/// - `task`: Tasks with attachments and completion state
///
/// # Example
///
/// ```no_run
/// use tasklist_shared::models::user::{User, CreateUser};
/// use tasklist_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::in_memory()).await?;
///
/// let new_user = CreateUser {
///     name: "John Doe".to_string(),
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod access_token;
pub mod task;
pub mod user;
