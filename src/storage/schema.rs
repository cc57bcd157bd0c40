use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::StorageError;
use crate::config::StoreConfig;

// ============================================================================
// FeedStore
// ============================================================================

/// Handle to the feed item store.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct FeedStore {
    pub(crate) pool: SqlitePool,
}

impl FeedStore {
    /// Open the store at `path` with default settings and run migrations.
    ///
    /// Pass `":memory:"` for a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another process has the
    /// database locked (SQLITE_BUSY, SQLITE_LOCKED, SQLITE_CANTOPEN).
    /// Returns [`StorageError::Migration`] if schema setup fails.
    pub async fn open(path: &str) -> Result<Self, StorageError> {
        let config = StoreConfig {
            path: path.to_string(),
            ..StoreConfig::default()
        };
        Self::open_with(&config).await
    }

    /// Open the store using explicit connection settings.
    pub async fn open_with(config: &StoreConfig) -> Result<Self, StorageError> {
        let url = format!("sqlite:{}?mode=rwc", config.path);

        // busy_timeout: SQLite waits for locks to release before returning
        // SQLITE_BUSY. Using pragma() on the connect options ensures every
        // connection in the pool inherits the setting.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StorageError::from_sqlx)?
            .pragma("busy_timeout", config.busy_timeout_ms.to_string());

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(StorageError::from_sqlx)?;

        let store = Self { pool };
        store.migrate().await.map_err(|e| {
            // Migration errors could also be lock-related
            let error_string = e.to_string().to_lowercase();
            if error_string.contains("database is locked")
                || error_string.contains("database table is locked")
                || error_string.contains("sqlite_busy")
                || error_string.contains("sqlite_locked")
            {
                StorageError::Locked
            } else {
                StorageError::Migration(e.to_string())
            }
        })?;
        Ok(store)
    }

    /// Create the schema if it does not exist yet.
    ///
    /// All statements run in a single transaction and use `IF NOT
    /// EXISTS`, so re-running on an existing database is a no-op and a
    /// failure mid-way leaves the previous schema intact.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                publish_time INTEGER NOT NULL,
                feed_source TEXT NOT NULL,
                url TEXT NOT NULL,
                domain TEXT NOT NULL,
                img TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                content_type TEXT NOT NULL,
                publisher_id TEXT NOT NULL,
                publisher_name TEXT NOT NULL,
                publisher_logo TEXT NOT NULL,
                session_displayed TEXT NOT NULL DEFAULT '',
                removed INTEGER NOT NULL DEFAULT 0,
                liked INTEGER NOT NULL DEFAULT 0,
                unread INTEGER NOT NULL DEFAULT 1
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        // Indexes
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_items_publish_time ON items(publish_time DESC)",
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_publisher ON items(publisher_id)")
            .execute(&mut *tx)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_items_url ON items(url)")
            .execute(&mut *tx)
            .await?;

        // Partial index covering the page queries: filters on
        // session_displayed over live rows, orders by publish_time DESC
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_items_live_session ON items(session_displayed, publish_time DESC) WHERE removed = 0",
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
