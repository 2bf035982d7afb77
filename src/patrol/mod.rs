//! Patrols: independently enabled, independently scheduled maintenance units
//! run by the daemon.
//!
//! A patrol is a plain table entry (name, default interval, default enabled
//! flag, invocation). Its enabled flag and interval are looked up in the
//! config snapshot every time it comes due, so edits apply without restart.

pub mod pane_watchdog;
pub mod scheduler;
pub mod wisp_reaper;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::config::DaemonConfig;
use crate::store::StoreError;
use crate::tmux::TmuxError;

pub use pane_watchdog::PaneWatchdog;
pub use scheduler::PatrolScheduler;
pub use wisp_reaper::WispReaper;

#[derive(Debug, Error)]
pub enum PatrolError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tmux(#[from] TmuxError),
    #[error("{0}")]
    Failed(String),
}

/// Everything a single invocation may read. Built fresh for every run.
#[derive(Debug, Clone)]
pub struct PatrolContext {
    pub config: Arc<DaemonConfig>,
    pub correlation_id: String,
}

impl PatrolContext {
    pub fn new(config: Arc<DaemonConfig>) -> Self {
        Self {
            config,
            correlation_id: crate::telemetry::generate_correlation_id(),
        }
    }
}

/// Outcome of one successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatrolReport {
    pub summary: String,
    /// Set when the run detected something that needs a human.
    pub escalation: Option<String>,
}

impl PatrolReport {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            escalation: None,
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Patrol: Send + Sync {
    fn name(&self) -> &'static str;

    /// Interval used when the config has none or an unusable one.
    fn default_interval(&self) -> Duration;

    /// Whether the patrol runs when the config says nothing about it.
    fn enabled_by_default(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &PatrolContext) -> Result<PatrolReport, PatrolError>;
}
