//! Database initialization tests
//!
//! - Database file is created on first run
//! - Re-opening an existing database is idempotent
//! - All five content tables exist with their asset slot columns
//! - Foreign keys are enforced on pooled connections

use hcm_common::db::init::{init_database, init_memory_database};
use tempfile::TempDir;

async fn table_names(pool: &sqlx::SqlitePool) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

async fn column_names(pool: &sqlx::SqlitePool, table: &str) -> Vec<String> {
    sqlx::query_scalar::<_, String>(&format!("SELECT name FROM pragma_table_info('{}')", table))
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("hcm.db");

    let result = init_database(&db_path, 2).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("hcm.db");

    let pool1 = init_database(&db_path, 2).await.unwrap();
    sqlx::query("INSERT INTO classes (name) VALUES ('Lớp 10')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path, 2).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classes")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1, "Existing rows must survive re-initialization");
}

#[tokio::test]
async fn test_all_content_tables_created() {
    let pool = init_memory_database().await.unwrap();
    let tables = table_names(&pool).await;

    for expected in ["books", "classes", "lessons", "regions", "special_articles"] {
        assert!(tables.iter().any(|t| t == expected), "Missing table: {}", expected);
    }
}

#[tokio::test]
async fn test_asset_slot_columns_present() {
    let pool = init_memory_database().await.unwrap();

    assert!(column_names(&pool, "regions").await.contains(&"cover".to_string()));
    assert!(column_names(&pool, "books").await.contains(&"cover".to_string()));
    assert!(column_names(&pool, "lessons").await.contains(&"attachment".to_string()));

    let special = column_names(&pool, "special_articles").await;
    assert!(special.contains(&"cover".to_string()));
    assert!(special.contains(&"attachment".to_string()));
    assert!(special.contains(&"slug".to_string()));
}

#[tokio::test]
async fn test_foreign_keys_enforced() {
    let pool = init_memory_database().await.unwrap();

    let result = sqlx::query(
        "INSERT INTO books (title, position, class_id, region_id) VALUES ('Orphan', 0, 99, 99)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Insert referencing missing class must fail");
}
