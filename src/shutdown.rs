use anyhow::Result;
use tokio::sync::watch;
use tracing::{info, warn};

/// Graceful shutdown coordinator for the daemon.
///
/// Holds the sending side of a `watch` channel. Every long-running loop
/// subscribes and stops when the value flips to `true`.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    tx: watch::Sender<bool>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Install SIGINT/SIGTERM handlers that trigger shutdown once.
    pub fn install_signal_handlers(&self) -> Result<()> {
        let coordinator = self.clone();

        #[cfg(unix)]
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

        tokio::spawn(async move {
            #[cfg(unix)]
            {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            warn!(error = %e, "failed to listen for ctrl-c");
                            return;
                        }
                        info!("Received SIGINT, shutting down");
                    }
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            #[cfg(not(unix))]
            {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for ctrl-c");
                    return;
                }
                info!("Received ctrl-c, shutting down");
            }
            coordinator.trigger();
        });

        info!("Shutdown coordinator ready - will shutdown gracefully on SIGINT/SIGTERM");
        Ok(())
    }

    /// Resolve once shutdown has been triggered.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so `wait_for` cannot observe a closed channel.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}
