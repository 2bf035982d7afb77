//! SQLite backend: one `<name>.db` file per store inside a directory.
//!
//! Used for local single-machine setups and for exercising the reaper's SQL
//! against a real engine in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{close_stale_sql_sqlite, count_active_sql, StoreConnector, StoreError, WispStore};
use crate::config::StoreConfig;

/// Table layout matching the upstream `wisps` contract.
pub const WISPS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS wisps (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    closed_at TEXT NULL
)
"#;

#[derive(Debug, Clone)]
pub struct SqliteConnector {
    dir: PathBuf,
}

impl SqliteConnector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, store: &str) -> PathBuf {
        self.dir.join(format!("{store}.db"))
    }

    /// Create (or open) a store file with the `wisps` table in place.
    pub async fn init_store(&self, store: &str) -> Result<SqliteConnection, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(self.path_for(store))
            .create_if_missing(true);
        let mut conn = SqliteConnection::connect_with(&opts)
            .await
            .map_err(|source| StoreError::Connect {
                store: store.to_string(),
                source,
            })?;
        sqlx::query(WISPS_SCHEMA)
            .execute(&mut conn)
            .await
            .map_err(|source| StoreError::Query {
                store: store.to_string(),
                operation: "create wisps table",
                source,
            })?;
        Ok(conn)
    }
}

#[async_trait]
impl StoreConnector for SqliteConnector {
    async fn connect(
        &self,
        settings: &StoreConfig,
        store: &str,
    ) -> Result<Box<dyn WispStore>, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(self.path_for(store))
            .create_if_missing(false)
            .busy_timeout(settings.connect_timeout());
        let conn = SqliteConnection::connect_with(&opts)
            .await
            .map_err(|source| StoreError::Connect {
                store: store.to_string(),
                source,
            })?;
        debug!(store, dir = %self.dir.display(), "opened sqlite store");
        Ok(Box::new(SqliteWispStore {
            store: store.to_string(),
            conn,
        }))
    }

    async fn discover(&self, _settings: &StoreConfig) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| StoreError::Discovery(format!("{}: {e}", self.dir.display())))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Discovery(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("db") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

pub struct SqliteWispStore {
    store: String,
    conn: SqliteConnection,
}

#[async_trait]
impl WispStore for SqliteWispStore {
    async fn close_stale(
        &mut self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(&close_stale_sql_sqlite("wisps"))
            .bind(now)
            .bind(cutoff)
            .execute(&mut self.conn)
            .await
            .map_err(|source| StoreError::Query {
                store: self.store.clone(),
                operation: "close stale wisps",
                source,
            })?;
        Ok(result.rows_affected())
    }

    async fn count_active(&mut self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(&count_active_sql("wisps"))
            .fetch_one(&mut self.conn)
            .await
            .map_err(|source| StoreError::Query {
                store: self.store.clone(),
                operation: "count open wisps",
                source,
            })?;
        Ok(count.max(0) as u64)
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.conn.close().await.map_err(|source| StoreError::Query {
            store: this.store,
            operation: "close connection",
            source,
        })
    }
}
