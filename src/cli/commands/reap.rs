use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;

use super::load_config;
use crate::daemon::connector_from_config;
use crate::patrol::wisp_reaper::{ReapSummary, WISP_ALERT_THRESHOLD};
use crate::patrol::WispReaper;

pub struct ReapCommand {
    pub config_path: Option<PathBuf>,
    pub databases: Vec<String>,
    pub max_age: Option<String>,
    pub json: bool,
}

impl ReapCommand {
    pub async fn execute(&self) -> Result<()> {
        let mut config = load_config(self.config_path.as_deref())?;
        let reaper_config = config.patrols.wisp_reaper.get_or_insert_with(Default::default);
        if !self.databases.is_empty() {
            reaper_config.databases = self.databases.clone();
        }
        if self.max_age.is_some() {
            reaper_config.max_age = self.max_age.clone();
        }

        let connector = connector_from_config(&config.store)?;
        let summary = WispReaper::new(connector).reap(&config, Utc::now()).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            print_summary(&summary);
        }

        if summary.alert {
            tracing::warn!(
                target: "pane_warden::escalation",
                escalation = true,
                open = summary.total_open,
                threshold = WISP_ALERT_THRESHOLD,
                "open wisp count exceeds threshold"
            );
        }
        Ok(())
    }
}

fn print_summary(summary: &ReapSummary) {
    if summary.stores.is_empty() && summary.failures.is_empty() && summary.skipped_invalid.is_empty()
    {
        println!("📭 No stores to sweep");
        return;
    }

    println!("🧹 Wisp reaper sweep");
    if let Some(cutoff) = summary.cutoff {
        println!("   Cutoff: {}", cutoff.to_rfc3339());
    }
    for store in &summary.stores {
        println!(
            "   ✅ {}: reaped {}, {} still open",
            store.store, store.reaped, store.open
        );
    }
    for failure in &summary.failures {
        println!("   ❌ {}: {}", failure.store, failure.error);
    }
    for name in &summary.skipped_invalid {
        println!("   ⚠️  {name:?}: skipped (invalid store name)");
    }
    println!();
    println!(
        "📊 Total: reaped {}, {} open",
        summary.total_reaped, summary.total_open
    );
    if summary.alert {
        println!(
            "🚨 Open wisps exceed {WISP_ALERT_THRESHOLD}; check for a wisp lifecycle bug"
        );
    }
}
