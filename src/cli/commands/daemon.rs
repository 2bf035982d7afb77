use anyhow::Result;
use std::path::PathBuf;

use crate::config::{DaemonConfig, SharedConfig};
use crate::daemon::Daemon;
use crate::shutdown::ShutdownCoordinator;
use crate::telemetry::{init_telemetry, LogFormat};

pub struct DaemonCommand {
    pub config_path: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl DaemonCommand {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            log_format: LogFormat::Json,
        }
    }

    pub fn with_log_format(mut self, log_format: LogFormat) -> Self {
        self.log_format = log_format;
        self
    }

    pub async fn execute(&self) -> Result<()> {
        init_telemetry(self.log_format)?;
        DaemonConfig::load_env_file();

        let config = SharedConfig::from_file(self.config_path.clone())?;
        let shutdown = ShutdownCoordinator::new();
        shutdown.install_signal_handlers()?;

        Daemon::new(config, shutdown).run().await
    }
}
