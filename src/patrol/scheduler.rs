//! Timer loop that fires each registered patrol on its own interval.
//!
//! Invariants:
//! - A patrol never overlaps itself: if its previous run is still going when
//!   it comes due, that tick is skipped, not queued.
//! - One patrol failing or panicking never stops the loop or other patrols.
//! - Enabled flag and interval are read from a fresh config snapshot on
//!   every tick.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Instrument};

use super::{Patrol, PatrolContext};
use crate::config::{ConfigProvider, DaemonConfig};
use crate::observability::{MetricsRegistry, OperationTimer, PatrolMetrics};
use crate::telemetry::create_patrol_span;

struct PatrolEntry {
    patrol: Arc<dyn Patrol>,
    metrics: Arc<PatrolMetrics>,
    last_started: Instant,
    in_flight: Option<JoinHandle<()>>,
}

impl PatrolEntry {
    fn is_running(&self) -> bool {
        self.in_flight.as_ref().is_some_and(|h| !h.is_finished())
    }
}

pub struct PatrolScheduler {
    config: Arc<dyn ConfigProvider>,
    entries: Vec<PatrolEntry>,
    metrics: MetricsRegistry,
}

impl PatrolScheduler {
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        Self {
            config,
            entries: Vec::new(),
            metrics: MetricsRegistry::default(),
        }
    }

    /// Add a patrol. Names are unique; a second registration is ignored.
    pub fn register(&mut self, patrol: Arc<dyn Patrol>) {
        let name = patrol.name();
        if self.entries.iter().any(|e| e.patrol.name() == name) {
            warn!(patrol = name, "patrol already registered; ignoring duplicate");
            return;
        }
        let metrics = self.metrics.register(name);
        self.entries.push(PatrolEntry {
            patrol,
            metrics,
            last_started: Instant::now(),
            in_flight: None,
        });
    }

    pub fn patrol_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.patrol.name()).collect()
    }

    /// Shared handle on the per-patrol counters.
    pub fn metrics(&self) -> MetricsRegistry {
        self.metrics.clone()
    }

    /// Run until `shutdown` flips to true (or its sender is dropped), then
    /// give in-flight runs up to the configured shutdown timeout to finish.
    ///
    /// Each patrol first fires one interval after the loop starts.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let tick = self.config.snapshot().scheduler.tick();
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let started = Instant::now();
        for entry in &mut self.entries {
            entry.last_started = started;
        }
        info!(patrols = ?self.patrol_names(), ?tick, "patrol scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.tick(Instant::now());
                }
            }
        }

        let timeout = self.config.snapshot().scheduler.shutdown_timeout();
        self.drain(timeout).await;
    }

    /// Start every patrol that is enabled and due at `now`. Returns the
    /// names of the patrols started.
    pub(crate) fn tick(&mut self, now: Instant) -> Vec<&'static str> {
        let config = self.config.snapshot();
        let mut started = Vec::new();

        for entry in &mut self.entries {
            let name = entry.patrol.name();
            let settings = config.patrol_settings(name);
            if !settings.is_enabled(entry.patrol.enabled_by_default()) {
                continue;
            }
            let interval = settings.interval_or(entry.patrol.default_interval());
            if now.duration_since(entry.last_started) < interval {
                continue;
            }

            entry.last_started = now;
            if entry.is_running() {
                entry.metrics.record_overlap_skipped();
                warn!(patrol = name, "previous run still in progress; skipping tick");
                continue;
            }

            entry.in_flight = Some(spawn_run(
                entry.patrol.clone(),
                entry.metrics.clone(),
                config.clone(),
            ));
            started.push(name);
        }

        started
    }

    async fn drain(&mut self, timeout: Duration) {
        let mut pending = Vec::new();
        for entry in &mut self.entries {
            if let Some(handle) = entry.in_flight.take() {
                if !handle.is_finished() {
                    pending.push((entry.patrol.name(), handle));
                }
            }
        }

        if pending.is_empty() {
            info!("patrol scheduler stopped");
            return;
        }

        let names: Vec<&'static str> = pending.iter().map(|(name, _)| *name).collect();
        info!(in_flight = ?names, ?timeout, "waiting for in-flight patrols");

        let wait = async {
            for (_, handle) in pending {
                let _ = handle.await;
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(()) => info!("patrol scheduler stopped"),
            Err(_) => warn!(
                abandoned = ?names,
                "in-flight patrols did not finish before shutdown timeout; abandoning"
            ),
        }
    }
}

/// Spawn one invocation. The patrol itself runs in an inner task so a panic
/// surfaces as a `JoinError` here instead of tearing anything else down.
fn spawn_run(
    patrol: Arc<dyn Patrol>,
    metrics: Arc<PatrolMetrics>,
    config: Arc<DaemonConfig>,
) -> JoinHandle<()> {
    let name = patrol.name();
    let ctx = PatrolContext::new(config);
    let span = create_patrol_span(name, &ctx.correlation_id);

    metrics.record_started();
    let timer = OperationTimer::new(name);
    debug!(parent: &span, "patrol starting");

    let run = tokio::spawn(async move { patrol.run(&ctx).await }.instrument(span.clone()));

    tokio::spawn(
        async move {
            match run.await {
                Ok(Ok(report)) => {
                    metrics.record_succeeded();
                    info!(summary = %report.summary, "patrol completed");
                    if let Some(detail) = report.escalation {
                        warn!(
                            target: "pane_warden::escalation",
                            escalation = true,
                            patrol = name,
                            detail = %detail,
                            "patrol escalation"
                        );
                    }
                }
                Ok(Err(e)) => {
                    metrics.record_failed();
                    error!(error = %e, "patrol failed");
                }
                Err(join) if join.is_panic() => {
                    metrics.record_failed();
                    error!("patrol panicked");
                }
                Err(join) => {
                    metrics.record_failed();
                    warn!(error = %join, "patrol task cancelled");
                }
            }
            timer.finish();
        }
        .instrument(span),
    )
}
