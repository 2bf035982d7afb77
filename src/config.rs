use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

// Compiled-in defaults. Used whenever a value is missing, unparsable or not
// positive.

pub const DEFAULT_CONFIG_FILE: &str = "pane-warden.toml";
pub const ENV_PREFIX: &str = "PANE_WARDEN";

pub const DEFAULT_TMUX_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_STORE_HOST: &str = "127.0.0.1";
pub const DEFAULT_STORE_PORT: u16 = 3307;
pub const DEFAULT_STORE_USER: &str = "root";
pub const DEFAULT_STORE_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_SCHEDULER_TICK: Duration = Duration::from_secs(10);
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_WISP_REAPER_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_WISP_MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_WISP_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PANE_WATCHDOG_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("failed to write configuration to {path}: {message}")]
    Write { path: PathBuf, message: String },
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub tmux: TmuxConfig,
    pub store: StoreConfig,
    pub scheduler: SchedulerConfig,
    pub patrols: PatrolsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TmuxConfig {
    /// Isolation socket (`tmux -L <socket>`). Empty means the default server.
    pub socket: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout: Option<String>,
}

impl TmuxConfig {
    pub fn command_timeout(&self) -> Duration {
        parse_opt_or_default(&self.command_timeout, DEFAULT_TMUX_COMMAND_TIMEOUT)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Dolt,
    Sqlite,
}

/// Connection parameters for the wisp stores.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<String>,
    /// Directory holding `<name>.db` files when `backend = "sqlite"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Dolt,
            host: DEFAULT_STORE_HOST.to_string(),
            port: DEFAULT_STORE_PORT,
            user: DEFAULT_STORE_USER.to_string(),
            password: None,
            connect_timeout: None,
            sqlite_dir: None,
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        parse_opt_or_default(&self.connect_timeout, DEFAULT_STORE_CONNECT_TIMEOUT)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the timer loop wakes to check which patrols are due.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<String>,
    /// How long in-flight patrols may keep running after shutdown is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown_timeout: Option<String>,
}

impl SchedulerConfig {
    pub fn tick(&self) -> Duration {
        parse_opt_or_default(&self.tick, DEFAULT_SCHEDULER_TICK)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        parse_opt_or_default(&self.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PatrolsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wisp_reaper: Option<WispReaperConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pane_watchdog: Option<PaneWatchdogConfig>,
}

/// Fields every patrol shares: read at fire time, never cached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatrolSettings {
    pub enabled: Option<bool>,
    pub interval: Option<String>,
}

impl PatrolSettings {
    pub fn is_enabled(&self, enabled_by_default: bool) -> bool {
        self.enabled.unwrap_or(enabled_by_default)
    }

    pub fn interval_or(&self, default: Duration) -> Duration {
        parse_opt_or_default(&self.interval, default)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WispReaperConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// How often to run, e.g. "30m".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// Age after which an active wisp is closed, e.g. "24h".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<String>,
    /// Deadline for one store's connect, update, count and close.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_timeout: Option<String>,
    /// Stores to reap. Empty means discover them from the server.
    pub databases: Vec<String>,
}

impl WispReaperConfig {
    pub fn max_age(&self) -> Duration {
        parse_opt_or_default(&self.max_age, DEFAULT_WISP_MAX_AGE)
    }

    pub fn query_timeout(&self) -> Duration {
        parse_opt_or_default(&self.query_timeout, DEFAULT_WISP_QUERY_TIMEOUT)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PaneWatchdogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    /// Sessions whose panes are supervised and get the auto-respawn hook.
    pub sessions: Vec<String>,
}

impl DaemonConfig {
    /// Load configuration with precedence:
    /// 1. Compiled defaults
    /// 2. `path`, or `pane-warden.toml` in the working directory if present
    /// 3. Environment variables (`PANE_WARDEN__STORE__PORT=3308`)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, default_environment())
    }

    pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        match path {
            Some(p) => builder = builder.add_source(File::from(p).required(true)),
            None => {
                if Path::new(DEFAULT_CONFIG_FILE).exists() {
                    builder = builder.add_source(File::from(Path::new(DEFAULT_CONFIG_FILE)));
                }
            }
        }

        builder = builder.add_source(env);

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Write {
            path: PathBuf::new(),
            message: e.to_string(),
        })
    }

    /// Load `.env` if it exists.
    pub fn load_env_file() {
        if Path::new(".env").exists() {
            match dotenvy::dotenv() {
                Ok(_) => tracing::info!("Loaded environment variables from .env file"),
                Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
            }
        }
    }

    /// Shared enable/interval fields for the named patrol.
    pub fn patrol_settings(&self, name: &str) -> PatrolSettings {
        match name {
            "wisp_reaper" => self
                .patrols
                .wisp_reaper
                .as_ref()
                .map(|c| PatrolSettings {
                    enabled: c.enabled,
                    interval: c.interval.clone(),
                })
                .unwrap_or_default(),
            "pane_watchdog" => self
                .patrols
                .pane_watchdog
                .as_ref()
                .map(|c| PatrolSettings {
                    enabled: c.enabled,
                    interval: c.interval.clone(),
                })
                .unwrap_or_default(),
            _ => PatrolSettings::default(),
        }
    }
}

fn default_environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("patrols.wisp_reaper.databases")
        .with_list_parse_key("patrols.pane_watchdog.sessions")
}

/// Source of the current configuration for each patrol tick.
pub trait ConfigProvider: Send + Sync {
    fn snapshot(&self) -> Arc<DaemonConfig>;
}

/// Live, replaceable configuration. Readers get a cheap `Arc` snapshot; a
/// reload swaps the snapshot for subsequent ticks.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    current: Arc<RwLock<Arc<DaemonConfig>>>,
    source: Option<PathBuf>,
}

impl SharedConfig {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
            source: None,
        }
    }

    pub fn from_file(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = DaemonConfig::load(path.as_deref())?;
        Ok(Self {
            current: Arc::new(RwLock::new(Arc::new(config))),
            source: path,
        })
    }

    pub fn replace(&self, config: DaemonConfig) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(config);
    }

    /// Re-read the file this config came from. On failure the previous
    /// snapshot stays in effect.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let config = DaemonConfig::load(self.source.as_deref())?;
        self.replace(config);
        tracing::info!("Configuration reloaded");
        Ok(())
    }
}

impl ConfigProvider for SharedConfig {
    fn snapshot(&self) -> Arc<DaemonConfig> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn parse_opt_or_default(value: &Option<String>, default: Duration) -> Duration {
    match value {
        Some(s) => parse_duration_or_default(s, default),
        None => default,
    }
}

/// Parse `s` as a duration, falling back to `default` when it is empty,
/// malformed, zero or negative.
pub fn parse_duration_or_default(s: &str, default: Duration) -> Duration {
    match parse_duration(s) {
        Some(d) if !d.is_zero() => d,
        _ => default,
    }
}

/// Parse durations like `"300ms"`, `"1.5h"` or `"2h45m"`.
///
/// Returns `None` for malformed or negative input. A bare `"0"` is zero.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let s = match s.strip_prefix('-') {
        Some(rest) => {
            // Negative durations are never usable; "-0" is still zero.
            return if rest.trim_start_matches('0').is_empty() && !rest.is_empty() {
                Some(Duration::ZERO)
            } else {
                None
            };
        }
        None => s.strip_prefix('+').unwrap_or(s),
    };
    if s == "0" {
        return Some(Duration::ZERO);
    }
    if s.is_empty() {
        return None;
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let value: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += value * nanos_per_unit;
    }

    if !total.is_finite() || total > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(total.round() as u64))
}
