//! Wisp stores: the `wisps` table contract and the connectors that reach it.
//!
//! The schema is owned upstream. This module only encodes the parts the
//! reaper relies on: table `wisps`, columns `status`, `created_at`,
//! `closed_at`, and the status vocabulary below.

pub mod dolt;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::StoreConfig;

pub use dolt::DoltConnector;
pub use sqlite::SqliteConnector;

static STORE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_-]{0,63}$").expect("valid store regex"));

/// Store names end up inside SQL identifiers, so they must pass this before
/// any connection is attempted.
pub fn is_valid_store_name(name: &str) -> bool {
    STORE_NAME.is_match(name)
}

/// Lifecycle of a wisp. Transitions only move toward `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WispStatus {
    Open,
    Hooked,
    InProgress,
    Closed,
}

/// Statuses the reaper treats as still holding a lease.
pub const ACTIVE_STATUSES: [WispStatus; 3] =
    [WispStatus::Open, WispStatus::Hooked, WispStatus::InProgress];

impl WispStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WispStatus::Open => "open",
            WispStatus::Hooked => "hooked",
            WispStatus::InProgress => "in_progress",
            WispStatus::Closed => "closed",
        }
    }

}

impl std::fmt::Display for WispStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn active_status_list() -> String {
    ACTIVE_STATUSES
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One statement closing every active wisp created before the cutoff.
/// Binds: `closed_at`, `cutoff`.
pub fn close_stale_sql(table: &str) -> String {
    close_stale_sql_where(table, "created_at < ?")
}

/// SQLite keeps timestamps as TEXT in whatever format the writer used, so
/// both sides go through `julianday()` instead of comparing strings.
pub fn close_stale_sql_sqlite(table: &str) -> String {
    close_stale_sql_where(table, "julianday(created_at) < julianday(?)")
}

fn close_stale_sql_where(table: &str, created_before: &str) -> String {
    format!(
        "UPDATE {table} SET status = '{closed}', closed_at = ? WHERE status IN ({active}) AND {created_before}",
        closed = WispStatus::Closed.as_str(),
        active = active_status_list(),
    )
}

pub fn count_active_sql(table: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM {table} WHERE status IN ({active})",
        active = active_status_list(),
    )
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{store}: open connection: {source}")]
    Connect {
        store: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("{store}: {operation}: {source}")]
    Query {
        store: String,
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("{store}: timed out after {after:?}")]
    Timeout { store: String, after: Duration },
    #[error("store discovery failed: {0}")]
    Discovery(String),
}

/// Close a connection we are done with. A close error is logged and otherwise
/// ignored; returns whether the close was clean.
pub(crate) async fn close_logged<C: sqlx::Connection>(conn: C, store: &str) -> bool {
    match conn.close().await {
        Ok(()) => true,
        Err(e) => {
            debug!(store, error = %e, "error closing store connection");
            false
        }
    }
}

/// A short-lived connection to one store.
#[async_trait]
pub trait WispStore: Send {
    /// Close every active wisp created before `cutoff`, stamping `closed_at = now`.
    /// Returns the number of rows closed.
    async fn close_stale(
        &mut self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Number of wisps still in an active status.
    async fn count_active(&mut self) -> Result<u64, StoreError>;

    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}

/// Opens per-invocation connections. Connection parameters are passed in on
/// every call so a reloaded config takes effect on the next sweep.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        settings: &StoreConfig,
        store: &str,
    ) -> Result<Box<dyn WispStore>, StoreError>;

    /// Stores to sweep when none are configured explicitly.
    async fn discover(&self, settings: &StoreConfig) -> Result<Vec<String>, StoreError>;
}
