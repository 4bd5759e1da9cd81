//! Database initialization
//!
//! Both processes open the same SQLite file; the queue table is the only
//! shared durable state between them.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows the intake writer and player writer to coexist
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Wait out short write-lock contention instead of failing
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_queue_table(&pool).await?;

    Ok(pool)
}

/// Create the per-chat queue table (idempotent)
///
/// Identity is `(chat_id, position)`; position is assigned monotonically
/// per chat and never reused while the row exists.
pub async fn create_queue_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue (
            chat_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            requester_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            source_locator TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            requested_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (chat_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
