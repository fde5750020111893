//! Database connection management.
//!
//! Builds the `SQLx` connection pool for a database file, creating the file
//! and its parent directory on first use.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Maximum pooled connections. The scraper writes serially, so a small pool suffices.
const MAX_CONNECTIONS: u32 = 5;

/// Open a connection pool for the `SQLite` database at `path`.
///
/// `:memory:` opens a private in-memory database held by a single connection.
///
/// # Errors
/// Returns `DatabaseError` if:
/// - The path is not valid UTF-8
/// - The parent directory cannot be created
/// - The database file cannot be opened
pub async fn open_pool(path: impl AsRef<Path>) -> Result<Pool<Sqlite>> {
    let path = path.as_ref();
    let path_str = path
        .to_str()
        .ok_or_else(|| DatabaseError::Open("invalid database path: not valid UTF-8".to_string()))?;

    let in_memory = path_str == ":memory:";
    if !in_memory {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    let connect_options = SqliteConnectOptions::from_str(path_str)
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .create_if_missing(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS);
    if in_memory {
        // Every connection to :memory: is a separate database; keep exactly one alive
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to initialize pool: {e}")))?;

    tracing::info!("Database pool created at {}", path_str);

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_in_memory_pool() {
        let pool = open_pool(":memory:").await.expect("open in-memory pool");
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .expect("run trivial query");
        pool.close().await;
    }

    #[tokio::test]
    async fn test_open_creates_parent_directory() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("data").join("trawler.db");

        let pool = open_pool(&path).await.expect("open file pool");
        pool.close().await;

        assert!(path.exists());
    }
}
