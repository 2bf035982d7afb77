//! Closes wisps that have sat in an active status longer than the max age.
//!
//! Each store is swept independently under its own deadline. A store that
//! fails to connect, errors or times out is logged and skipped; it never
//! stops the remaining stores from being swept.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Patrol, PatrolContext, PatrolError, PatrolReport};
use crate::config::{DaemonConfig, StoreConfig, DEFAULT_WISP_REAPER_INTERVAL};
use crate::store::{is_valid_store_name, StoreConnector, StoreError};

pub const WISP_REAPER_NAME: &str = "wisp_reaper";

/// More open wisps than this across all stores is escalated.
pub const WISP_ALERT_THRESHOLD: u64 = 500;

pub fn exceeds_alert_threshold(open: u64) -> bool {
    open > WISP_ALERT_THRESHOLD
}

/// Per-store result of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreReap {
    pub store: String,
    pub reaped: u64,
    pub open: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreFailure {
    pub store: String,
    pub error: String,
}

/// Totals for one sweep across every store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReapSummary {
    pub cutoff: Option<DateTime<Utc>>,
    pub stores: Vec<StoreReap>,
    pub total_reaped: u64,
    pub total_open: u64,
    pub skipped_invalid: Vec<String>,
    pub failures: Vec<StoreFailure>,
    pub alert: bool,
}

pub struct WispReaper {
    connector: Arc<dyn StoreConnector>,
}

impl WispReaper {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self { connector }
    }

    /// One full cycle with the given config: resolve stores, sweep, log.
    /// Escalation is left to the caller via [`ReapSummary::alert`].
    pub async fn reap(&self, config: &DaemonConfig, now: DateTime<Utc>) -> ReapSummary {
        let reaper = config.patrols.wisp_reaper.clone().unwrap_or_default();
        let stores = if reaper.databases.is_empty() {
            match self.connector.discover(&config.store).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(error = %e, "wisp reaper could not discover stores");
                    Vec::new()
                }
            }
        } else {
            reaper.databases.clone()
        };

        if stores.is_empty() {
            info!("wisp reaper has no stores to sweep");
            return ReapSummary::default();
        }

        let summary = self
            .sweep(
                &config.store,
                &stores,
                reaper.max_age(),
                reaper.query_timeout(),
                now,
            )
            .await;

        if summary.total_reaped > 0 {
            info!(
                reaped = summary.total_reaped,
                open = summary.total_open,
                stores = summary.stores.len(),
                "wisp reaper closed stale wisps"
            );
        }
        summary
    }

    /// Close active wisps older than `max_age` in each of `stores`, giving
    /// each store `query_timeout` to finish.
    pub async fn sweep(
        &self,
        settings: &StoreConfig,
        stores: &[String],
        max_age: Duration,
        query_timeout: Duration,
        now: DateTime<Utc>,
    ) -> ReapSummary {
        let cutoff = cutoff_for(now, max_age);
        let mut summary = ReapSummary {
            cutoff: Some(cutoff),
            ..Default::default()
        };

        for store in stores {
            if !is_valid_store_name(store) {
                warn!(store = %store, "skipping store with invalid name");
                summary.skipped_invalid.push(store.clone());
                continue;
            }

            match self
                .reap_store(settings, store, cutoff, now, query_timeout)
                .await
            {
                Ok(result) => {
                    if result.reaped > 0 {
                        info!(store = %store, reaped = result.reaped, "reaped stale wisps");
                    }
                    summary.total_reaped += result.reaped;
                    summary.total_open += result.open;
                    summary.stores.push(result);
                }
                Err(e) => {
                    warn!(store = %store, error = %e, "wisp reaper failed for store");
                    summary.failures.push(StoreFailure {
                        store: store.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        summary.alert = exceeds_alert_threshold(summary.total_open);
        summary
    }

    async fn reap_store(
        &self,
        settings: &StoreConfig,
        store: &str,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        query_timeout: Duration,
    ) -> Result<StoreReap, StoreError> {
        let work = async {
            let mut conn = self.connector.connect(settings, store).await?;
            let outcome = async {
                let reaped = conn.close_stale(cutoff, now).await?;
                let open = conn.count_active().await?;
                Ok::<_, StoreError>((reaped, open))
            }
            .await;
            if let Err(e) = conn.close().await {
                debug!(store, error = %e, "error closing store connection");
            }
            let (reaped, open) = outcome?;
            Ok::<_, StoreError>(StoreReap {
                store: store.to_string(),
                reaped,
                open,
            })
        };

        tokio::time::timeout(query_timeout, work)
            .await
            .map_err(|_| StoreError::Timeout {
                store: store.to_string(),
                after: query_timeout,
            })?
    }
}

fn cutoff_for(now: DateTime<Utc>, max_age: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(max_age)
        .ok()
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[async_trait]
impl Patrol for WispReaper {
    fn name(&self) -> &'static str {
        WISP_REAPER_NAME
    }

    fn default_interval(&self) -> Duration {
        DEFAULT_WISP_REAPER_INTERVAL
    }

    async fn run(&self, ctx: &PatrolContext) -> Result<PatrolReport, PatrolError> {
        let summary = self.reap(&ctx.config, Utc::now()).await;

        let mut report = PatrolReport::new(format!(
            "reaped {} wisps across {} stores, {} open, {} failed",
            summary.total_reaped,
            summary.stores.len(),
            summary.total_open,
            summary.failures.len()
        ));
        if summary.alert {
            report.escalation = Some(format!(
                "{} open wisps (threshold {WISP_ALERT_THRESHOLD})",
                summary.total_open
            ));
        }
        Ok(report)
    }
}
