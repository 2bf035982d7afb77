use anyhow::Result;
use clap::Parser;

use pane_warden::cli::commands::daemon::DaemonCommand;
use pane_warden::cli::commands::hook::{HookInstallCommand, HookShowCommand};
use pane_warden::cli::commands::pane::{PaneRespawnCommand, PaneStatusCommand};
use pane_warden::cli::commands::reap::ReapCommand;
use pane_warden::cli::commands::show_config::ConfigShowCommand;
use pane_warden::cli::commands::show_how_to_start;
use pane_warden::cli::{Cli, Commands, ConfigAction, HookAction, PaneAction};
use pane_warden::telemetry::{init_telemetry, LogFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config;

    // The daemon sets up its own log format; one-shot commands log to stderr.
    if !matches!(cli.command, Some(Commands::Daemon { .. })) {
        init_telemetry(LogFormat::Pretty)?;
    }

    match cli.command {
        None => tokio::runtime::Runtime::new()?.block_on(async { show_how_to_start().await }),
        Some(Commands::Daemon { log_format }) => {
            tokio::runtime::Runtime::new()?.block_on(async {
                DaemonCommand::new(config_path)
                    .with_log_format(log_format.into())
                    .execute()
                    .await
            })
        }
        Some(Commands::Hook { action }) => tokio::runtime::Runtime::new()?.block_on(async {
            match action {
                HookAction::Install { session, socket } => {
                    HookInstallCommand {
                        config_path,
                        session,
                        socket,
                    }
                    .execute()
                    .await
                }
                HookAction::Show { session, socket } => {
                    HookShowCommand {
                        config_path,
                        session,
                        socket,
                    }
                    .execute()
                    .await
                }
            }
        }),
        Some(Commands::Pane { action }) => tokio::runtime::Runtime::new()?.block_on(async {
            match action {
                PaneAction::Status { session, socket } => {
                    PaneStatusCommand {
                        config_path,
                        session,
                        socket,
                    }
                    .execute()
                    .await
                }
                PaneAction::Respawn {
                    session,
                    socket,
                    command,
                } => {
                    PaneRespawnCommand {
                        config_path,
                        session,
                        socket,
                        command,
                    }
                    .execute()
                    .await
                }
            }
        }),
        Some(Commands::Reap {
            databases,
            max_age,
            json,
        }) => tokio::runtime::Runtime::new()?.block_on(async {
            ReapCommand {
                config_path,
                databases,
                max_age,
                json,
            }
            .execute()
            .await
        }),
        Some(Commands::Config {
            action: ConfigAction::Show { output },
        }) => tokio::runtime::Runtime::new()?.block_on(async {
            ConfigShowCommand {
                config_path,
                output,
            }
            .execute()
            .await
        }),
    }
}
