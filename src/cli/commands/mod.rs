use anyhow::Result;
use std::path::Path;

use crate::config::DaemonConfig;
use crate::daemon::tmux_from_config;
use crate::tmux::Tmux;

pub mod daemon;
pub mod hook;
pub mod pane;
pub mod reap;
pub mod show_config;

/// Effective config for one-shot commands: `.env`, then file, then env vars.
pub fn load_config(path: Option<&Path>) -> Result<DaemonConfig> {
    DaemonConfig::load_env_file();
    Ok(DaemonConfig::load(path)?)
}

/// tmux handle for a CLI command. `--socket` wins over the configured socket.
pub fn tmux_for(config: &DaemonConfig, socket: Option<&str>) -> Tmux {
    match socket {
        Some(socket) => {
            let mut config = config.clone();
            config.tmux.socket = socket.to_string();
            tmux_from_config(&config)
        }
        None => tmux_from_config(config),
    }
}

pub async fn show_how_to_start() -> Result<()> {
    println!("🛡️  pane-warden - tmux session supervisor");
    println!();
    println!("To get started:");
    println!("  🚀 pane-warden daemon                 # Run hooks + patrols in the foreground");
    println!("  🪝 pane-warden hook install <session> # Auto-respawn a session's pane");
    println!("  🩺 pane-warden pane status <session>  # Check whether a pane is dead");
    println!("  🧹 pane-warden reap                   # Close stale wisps once");
    println!("  ⚙️  pane-warden config show            # Print the effective configuration");
    Ok(())
}
