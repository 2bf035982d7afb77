use anyhow::Result;
use std::path::PathBuf;

use super::{load_config, tmux_for};
use crate::tmux::build_auto_respawn_hook_cmd;

pub struct HookInstallCommand {
    pub config_path: Option<PathBuf>,
    pub session: String,
    pub socket: Option<String>,
}

impl HookInstallCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = load_config(self.config_path.as_deref())?;
        let tmux = tmux_for(&config, self.socket.as_deref());

        tmux.set_auto_respawn_hook(&self.session).await?;
        println!("✅ Auto-respawn hook installed on '{}'", self.session);
        println!("   🔌 Server: {}", tmux.command_prefix());
        Ok(())
    }
}

pub struct HookShowCommand {
    pub config_path: Option<PathBuf>,
    pub session: String,
    pub socket: Option<String>,
}

impl HookShowCommand {
    /// Prints only the hook text so it can be piped into `tmux set-hook`.
    pub async fn execute(&self) -> Result<()> {
        let config = load_config(self.config_path.as_deref())?;
        let tmux = tmux_for(&config, self.socket.as_deref());
        println!(
            "{}",
            build_auto_respawn_hook_cmd(&tmux.command_prefix(), &self.session)
        );
        Ok(())
    }
}
