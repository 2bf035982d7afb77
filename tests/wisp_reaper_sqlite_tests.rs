// Wisp reaper against real SQLite stores: one `<name>.db` file per store.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use pane_warden::config::{
    DaemonConfig, StoreBackend, StoreConfig, WispReaperConfig, DEFAULT_WISP_QUERY_TIMEOUT,
};
use pane_warden::patrol::wisp_reaper::WispReaper;
use pane_warden::store::SqliteConnector;
use sqlx::{Connection, Row};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    _dir: tempfile::TempDir,
    connector: SqliteConnector,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let connector = SqliteConnector::new(dir.path());
        Self {
            _dir: dir,
            connector,
        }
    }

    async fn seed(&self, store: &str, rows: &[(&str, &str, DateTime<Utc>)]) {
        let mut conn = self.connector.init_store(store).await.unwrap();
        for (id, status, created_at) in rows {
            sqlx::query("INSERT INTO wisps (id, status, created_at) VALUES (?, ?, ?)")
                .bind(*id)
                .bind(*status)
                .bind(*created_at)
                .execute(&mut conn)
                .await
                .unwrap();
        }
        conn.close().await.unwrap();
    }

    async fn seed_closed(&self, store: &str, id: &str, created_at: DateTime<Utc>, closed_at: DateTime<Utc>) {
        let mut conn = self.connector.init_store(store).await.unwrap();
        sqlx::query("INSERT INTO wisps (id, status, created_at, closed_at) VALUES (?, 'closed', ?, ?)")
            .bind(id)
            .bind(created_at)
            .bind(closed_at)
            .execute(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
    }

    async fn row(&self, store: &str, id: &str) -> (String, Option<DateTime<Utc>>) {
        let mut conn = self.connector.init_store(store).await.unwrap();
        let row = sqlx::query("SELECT status, closed_at FROM wisps WHERE id = ?")
            .bind(id)
            .fetch_one(&mut conn)
            .await
            .unwrap();
        let result = (row.get("status"), row.get("closed_at"));
        conn.close().await.unwrap();
        result
    }

    fn reaper(&self) -> WispReaper {
        WispReaper::new(Arc::new(self.connector.clone()))
    }

    fn config(&self, databases: &[&str]) -> DaemonConfig {
        let mut config = DaemonConfig::default();
        config.store = StoreConfig {
            backend: StoreBackend::Sqlite,
            sqlite_dir: Some(self.connector.dir().to_path_buf()),
            ..Default::default()
        };
        config.patrols.wisp_reaper = Some(WispReaperConfig {
            enabled: Some(true),
            databases: databases.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        });
        config
    }
}

#[tokio::test]
async fn closes_stale_active_wisps_and_stamps_closed_at() {
    let fx = Fixture::new();
    let now = Utc::now();
    fx.seed(
        "hq",
        &[
            ("old-open", "open", now - ChronoDuration::hours(30)),
            ("old-hooked", "hooked", now - ChronoDuration::hours(25)),
            ("old-working", "in_progress", now - ChronoDuration::days(3)),
            ("fresh", "open", now - ChronoDuration::hours(2)),
        ],
    )
    .await;

    let summary = fx.reaper().reap(&fx.config(&["hq"]), now).await;

    assert_eq!(summary.total_reaped, 3);
    assert_eq!(summary.total_open, 1);
    for id in ["old-open", "old-hooked", "old-working"] {
        let (status, closed_at) = fx.row("hq", id).await;
        assert_eq!(status, "closed", "{id}");
        assert_eq!(closed_at, Some(now), "{id}");
    }
    let (status, closed_at) = fx.row("hq", "fresh").await;
    assert_eq!(status, "open");
    assert_eq!(closed_at, None);
}

#[tokio::test]
async fn already_closed_wisps_are_untouched() {
    let fx = Fixture::new();
    let now = Utc::now();
    let closed_at = now - ChronoDuration::days(5);
    fx.seed_closed("hq", "done", now - ChronoDuration::days(6), closed_at).await;

    let summary = fx.reaper().reap(&fx.config(&["hq"]), now).await;

    assert_eq!(summary.total_reaped, 0);
    assert_eq!(fx.row("hq", "done").await, ("closed".to_string(), Some(closed_at)));
}

#[tokio::test]
async fn second_sweep_is_a_no_op() {
    let fx = Fixture::new();
    let now = Utc::now();
    fx.seed("hq", &[("stale", "open", now - ChronoDuration::hours(48))]).await;

    let first = fx.reaper().reap(&fx.config(&["hq"]), now).await;
    let second = fx
        .reaper()
        .reap(&fx.config(&["hq"]), now + ChronoDuration::minutes(30))
        .await;

    assert_eq!(first.total_reaped, 1);
    assert_eq!(second.total_reaped, 0);
    assert_eq!(fx.row("hq", "stale").await.1, Some(now));
}

#[tokio::test]
async fn max_age_override_moves_the_cutoff() {
    let fx = Fixture::new();
    let now = Utc::now();
    fx.seed("hq", &[("two-hours", "open", now - ChronoDuration::hours(2))]).await;

    let summary = fx
        .reaper()
        .sweep(
            &fx.config(&[]).store,
            &["hq".to_string()],
            Duration::from_secs(3600),
            DEFAULT_WISP_QUERY_TIMEOUT,
            now,
        )
        .await;

    assert_eq!(summary.total_reaped, 1);
}

#[tokio::test]
async fn discovers_store_files_and_skips_missing_ones() {
    let fx = Fixture::new();
    let now = Utc::now();
    fx.seed("hq", &[("a", "open", now - ChronoDuration::hours(30))]).await;
    fx.seed("beads", &[("b", "hooked", now - ChronoDuration::hours(30))]).await;

    let discovered = fx.reaper().reap(&fx.config(&[]), now).await;
    assert_eq!(discovered.total_reaped, 2);
    assert_eq!(discovered.stores.len(), 2);

    let explicit = fx.reaper().reap(&fx.config(&["missing", "hq"]), now).await;
    assert_eq!(explicit.failures.len(), 1);
    assert_eq!(explicit.failures[0].store, "missing");
    assert_eq!(explicit.stores.len(), 1);
}
