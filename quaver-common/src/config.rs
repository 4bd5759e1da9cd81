//! Configuration loading
//!
//! Bootstrap configuration comes from a TOML file plus environment
//! overrides. Settings resolution priority:
//! 1. Command-line arguments ([`ConfigOverrides`]; ports are applied by
//!    each binary)
//! 2. Environment variables (`QUAVER_*`)
//! 3. TOML config file
//! 4. Built-in defaults
//!
//! The config file location is itself resolved in priority order:
//! explicit `--config` path, `QUAVER_CONFIG`, `./quaver.toml`, then the
//! platform config directory (e.g. `~/.config/quaver/config.toml`). A
//! missing file at a non-explicit location is not an error; defaults apply.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Bootstrap configuration shared by both processes
///
/// These settings cannot change during runtime. A process must restart to
/// pick up changes to the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Path to the SQLite queue database
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Redis URL for the action bridge
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Pub/sub channel name shared by both processes
    #[serde(default = "default_bridge_channel")]
    pub bridge_channel: String,

    /// Intake process settings
    #[serde(default)]
    pub intake: IntakeSettings,

    /// Player process settings
    #[serde(default)]
    pub player: PlayerSettings,
}

/// Settings specific to the intake process
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IntakeSettings {
    /// HTTP command-surface port
    #[serde(default = "default_intake_port")]
    pub port: u16,
}

/// Settings specific to the player process
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlayerSettings {
    /// HTTP state/health port
    #[serde(default = "default_player_port")]
    pub port: u16,

    /// Progress ticker interval; position advances by one per tick
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Budget for one source resolution call
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,

    /// Budget for one engine join/start call
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,

    /// Interval between reconcile passes over queue storage
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/quaver.db")
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_bridge_channel() -> String {
    "quaver_actions".to_string()
}

fn default_intake_port() -> u16 {
    5750
}

fn default_player_port() -> u16 {
    5751
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_resolve_timeout_ms() -> u64 {
    10_000
}

fn default_join_timeout_ms() -> u64 {
    10_000
}

fn default_reconcile_interval_ms() -> u64 {
    30_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            redis_url: default_redis_url(),
            bridge_channel: default_bridge_channel(),
            intake: IntakeSettings::default(),
            player: PlayerSettings::default(),
        }
    }
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            port: default_intake_port(),
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            port: default_player_port(),
            tick_interval_ms: default_tick_interval_ms(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
            join_timeout_ms: default_join_timeout_ms(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
        }
    }
}

impl PlayerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }
}

impl Settings {
    /// Load settings from the resolved config file and the environment
    ///
    /// An explicit path that does not exist is an error; a missing file at
    /// the default locations falls back to built-in defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut settings = match resolve_config_path(explicit_path)? {
            Some(path) => {
                let content = std::fs::read_to_string(&path)?;
                let parsed = Self::from_toml_str(&content)?;
                info!("Loaded configuration from {}", path.display());
                parsed
            }
            None => {
                debug!("No config file found, using built-in defaults");
                Self::default()
            }
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Parse settings from TOML text; missing keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Apply `QUAVER_*` environment overrides on top of file values
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("QUAVER_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("QUAVER_REDIS_URL") {
            self.redis_url = url;
        }
        if let Ok(channel) = std::env::var("QUAVER_BRIDGE_CHANNEL") {
            self.bridge_channel = channel;
        }
    }

    /// Apply command-line overrides on top of file and environment values
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.database_path {
            self.database_path = path;
        }
        if let Some(url) = overrides.redis_url {
            self.redis_url = url;
        }
    }
}

/// Command-line configuration overrides
///
/// Highest-priority rung: a `Some` field replaces whatever the file and
/// environment produced. Process-specific ports are overridden by each
/// binary directly.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub redis_url: Option<String>,
}

/// Resolve the config file location
///
/// Returns `Ok(None)` when no file exists at any non-explicit location.
fn resolve_config_path(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
    // Priority 1: explicit command-line path (must exist)
    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var("QUAVER_CONFIG") {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    // Priority 3: working directory
    let local = PathBuf::from("quaver.toml");
    if local.exists() {
        return Ok(Some(local));
    }

    // Priority 4: platform config directory
    if let Some(dir) = dirs::config_dir() {
        let path = dir.join("quaver").join("config.toml");
        if path.exists() {
            return Ok(Some(path));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(default_intake_port(), 5750);
        assert_eq!(default_player_port(), 5751);
    }

    #[test]
    fn test_default_intervals() {
        let player = PlayerSettings::default();
        assert_eq!(player.tick_interval(), Duration::from_secs(1));
        assert_eq!(player.reconcile_interval(), Duration::from_secs(30));
    }
}
