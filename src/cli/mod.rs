use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "pane-warden")]
#[command(about = "Keeps tmux-hosted agent sessions alive and reaps stale wisps")]
#[command(long_about = "pane-warden installs auto-respawn hooks on tmux sessions so dead agent panes \
                       come back on their own, and runs background patrols that recover missed panes \
                       and close abandoned wisps. Start the supervisor with 'pane-warden daemon'.")]
pub struct Cli {
    /// Configuration file (defaults to ./pane-warden.toml when present)
    #[arg(long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the supervisor: install hooks and run patrols until SIGINT/SIGTERM
    Daemon {
        /// Log line format
        #[arg(long, value_enum, default_value = "json", help = "Log format: json or pretty")]
        log_format: LogFormatArg,
    },
    /// Manage the auto-respawn pane-died hook
    Hook {
        #[command(subcommand)]
        action: HookAction,
    },
    /// Inspect or respawn a session's pane
    Pane {
        #[command(subcommand)]
        action: PaneAction,
    },
    /// Run one wisp reaper sweep now, regardless of the patrol's enabled flag
    Reap {
        /// Store to sweep (repeatable). Defaults to the configured or discovered stores
        #[arg(long = "database", help = "Store to sweep; may be given more than once")]
        databases: Vec<String>,
        /// Override the configured max age, e.g. "12h"
        #[arg(long, help = "Close active wisps older than this (e.g. 24h)")]
        max_age: Option<String>,
        /// Print the sweep summary as JSON
        #[arg(long, help = "Emit the summary as JSON")]
        json: bool,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum HookAction {
    /// Set remain-on-exit and install the pane-died hook on a session
    Install {
        session: String,
        /// tmux socket (-L); overrides the configured socket
        #[arg(long, help = "tmux socket name passed as -L")]
        socket: Option<String>,
    },
    /// Print the hook command that would be installed
    Show {
        session: String,
        #[arg(long, help = "tmux socket name passed as -L")]
        socket: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum PaneAction {
    /// Report whether the session's pane is dead, and its pid
    Status {
        session: String,
        #[arg(long, help = "tmux socket name passed as -L")]
        socket: Option<String>,
    },
    /// Respawn the pane if it is dead at the moment of the request
    Respawn {
        session: String,
        #[arg(long, help = "tmux socket name passed as -L")]
        socket: Option<String>,
        /// Replacement command; defaults to the pane's original command
        #[arg(long, help = "Command to run instead of the original one")]
        command: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show {
        #[arg(long, help = "Write the configuration to this file instead of stdout")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for crate::telemetry::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Json => crate::telemetry::LogFormat::Json,
            LogFormatArg::Pretty => crate::telemetry::LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_reap_with_repeated_databases() {
        let cli = Cli::try_parse_from([
            "pane-warden",
            "reap",
            "--database",
            "hq",
            "--database",
            "beads",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Reap { databases, json, max_age }) => {
                assert_eq!(databases, vec!["hq", "beads"]);
                assert!(json);
                assert!(max_age.is_none());
            }
            _ => panic!("expected reap"),
        }
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from([
            "pane-warden",
            "hook",
            "show",
            "hq-deacon",
            "--config",
            "/etc/pw.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/pw.toml")));
    }
}
