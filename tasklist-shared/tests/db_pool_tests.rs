/// Integration tests for the database connection pool

use tasklist_shared::db::pool::{close_pool, create_pool, health_check, DatabaseConfig};
use sqlx::Row;

#[tokio::test]
async fn test_create_pool_on_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.db");

    let config = DatabaseConfig {
        url: format!("sqlite://{}", path.display()),
        max_connections: 2,
        connect_timeout_seconds: 5,
        ..Default::default()
    };

    let pool = create_pool(config).await.expect("Failed to create pool");
    assert!(path.exists(), "Database file should be created");

    close_pool(pool).await;
}

#[tokio::test]
async fn test_health_check() {
    let pool = create_pool(DatabaseConfig::in_memory()).await.unwrap();

    assert!(health_check(&pool).await.is_ok());

    close_pool(pool).await;
}

#[tokio::test]
async fn test_foreign_keys_enabled() {
    let pool = create_pool(DatabaseConfig::in_memory()).await.unwrap();

    let row = sqlx::query("PRAGMA foreign_keys").fetch_one(&pool).await.unwrap();
    let enabled: i64 = row.get(0);
    assert_eq!(enabled, 1);
}

#[tokio::test]
async fn test_in_memory_state_shared_across_queries() {
    let pool = create_pool(DatabaseConfig::in_memory()).await.unwrap();

    sqlx::query("CREATE TABLE scratch (value INTEGER)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO scratch (value) VALUES (7)")
        .execute(&pool)
        .await
        .unwrap();

    let row = sqlx::query("SELECT value FROM scratch").fetch_one(&pool).await.unwrap();
    let value: i64 = row.get("value");
    assert_eq!(value, 7);
}

#[tokio::test]
async fn test_invalid_url() {
    let config = DatabaseConfig {
        url: "postgres://localhost/not-sqlite".to_string(),
        connect_timeout_seconds: 1,
        ..Default::default()
    };

    assert!(create_pool(config).await.is_err());
}
