// pane-warden library: tmux auto-respawn hooks, dead-pane recovery and the
// wisp reaper, plus the daemon that schedules them.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod external;
pub mod observability;
pub mod patrol;
pub mod shutdown;
pub mod store;
pub mod telemetry;
pub mod tmux;

// Re-export key types for easy access
pub use config::{ConfigProvider, DaemonConfig, SharedConfig};
pub use daemon::Daemon;
pub use external::{CommandExecutor, ProcessCommandExecutor};
pub use observability::{MetricsRegistry, OperationTimer, PatrolMetrics};
pub use patrol::{Patrol, PatrolContext, PatrolError, PatrolReport, PatrolScheduler};
pub use patrol::{PaneWatchdog, WispReaper};
pub use shutdown::ShutdownCoordinator;
pub use store::{StoreConnector, StoreError, WispStatus, WispStore};
pub use telemetry::{create_patrol_span, generate_correlation_id, init_telemetry, LogFormat};
pub use tmux::{build_auto_respawn_hook_cmd, RespawnOutcome, Tmux, TmuxError};
