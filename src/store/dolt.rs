//! Dolt (MySQL wire protocol) backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, Executor, Row};
use tracing::debug;

use super::{
    close_logged, close_stale_sql, count_active_sql, StoreConnector, StoreError, WispStore,
};
use crate::config::StoreConfig;

/// Schemas every MySQL-compatible server exposes that never hold wisps.
const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

/// Connects to databases on a local Dolt sql-server.
#[derive(Debug, Default, Clone, Copy)]
pub struct DoltConnector;

impl DoltConnector {
    fn options(settings: &StoreConfig) -> MySqlConnectOptions {
        let mut opts = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user);
        if let Some(password) = &settings.password {
            opts = opts.password(password);
        }
        opts
    }

    async fn open(
        settings: &StoreConfig,
        opts: MySqlConnectOptions,
        label: &str,
    ) -> Result<MySqlConnection, StoreError> {
        let timeout = settings.connect_timeout();
        tokio::time::timeout(timeout, MySqlConnection::connect_with(&opts))
            .await
            .map_err(|_| StoreError::Timeout {
                store: label.to_string(),
                after: timeout,
            })?
            .map_err(|source| StoreError::Connect {
                store: label.to_string(),
                source,
            })
    }
}

#[async_trait]
impl StoreConnector for DoltConnector {
    async fn connect(
        &self,
        settings: &StoreConfig,
        store: &str,
    ) -> Result<Box<dyn WispStore>, StoreError> {
        let opts = Self::options(settings).database(store);
        let conn = Self::open(settings, opts, store).await?;
        debug!(store, host = %settings.host, port = settings.port, "connected to dolt");
        Ok(Box::new(DoltWispStore {
            store: store.to_string(),
            table: format!("`{store}`.wisps"),
            conn,
        }))
    }

    async fn discover(&self, settings: &StoreConfig) -> Result<Vec<String>, StoreError> {
        let mut conn = Self::open(settings, Self::options(settings), "discovery").await?;
        let rows = (&mut conn)
            .fetch_all("SHOW DATABASES")
            .await
            .map_err(|e| StoreError::Discovery(e.to_string()))?;
        close_logged(conn, "discovery").await;

        let mut names = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row
                .try_get(0)
                .map_err(|e| StoreError::Discovery(e.to_string()))?;
            if !SYSTEM_SCHEMAS.contains(&name.to_ascii_lowercase().as_str()) {
                names.push(name);
            }
        }
        Ok(names)
    }
}

pub struct DoltWispStore {
    store: String,
    table: String,
    conn: MySqlConnection,
}

#[async_trait]
impl WispStore for DoltWispStore {
    async fn close_stale(
        &mut self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(&close_stale_sql(&self.table))
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
        let count: i64 = sqlx::query_scalar(&count_active_sql(&self.table))
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
