//! Configuration – reads/writes `scout.toml`.
//!
//! The file location is `scout.toml` in the working directory unless
//! `SCOUT_CONFIG` names another path. Every field has a default, so a partial
//! file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use scout_memory::MemoryConfig;
use scout_perception::GridConfig;
use scout_runtime::{LogSettings, LootConfig, PlannerConfig};

pub const DEFAULT_CONFIG_FILE: &str = "scout.toml";

/// Persisted runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot file written by the game bridge.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Action packet file read by the game bridge.
    #[serde(default = "default_action_file")]
    pub action_file: PathBuf,

    /// Root directory for grid chunk files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Visualisation snapshot.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: PathBuf,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,

    /// A state file younger than this at startup is kept (the game is
    /// already running); an older one is deleted as stale.
    #[serde(default = "default_hot_attach_ms")]
    pub hot_attach_ms: u64,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub planner: PlannerConfig,

    #[serde(default)]
    pub loot: LootConfig,

    #[serde(default)]
    pub log: LogSettings,
}

fn default_state_file() -> PathBuf {
    PathBuf::from("bridge/state.json")
}
fn default_action_file() -> PathBuf {
    PathBuf::from("bridge/input.json")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data/chunks")
}
fn default_snapshot_file() -> PathBuf {
    PathBuf::from("data/grid_snapshot.json")
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_snapshot_interval_ms() -> u64 {
    500
}
fn default_hot_attach_ms() -> u64 {
    5_000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
            action_file: default_action_file(),
            data_dir: default_data_dir(),
            snapshot_file: default_snapshot_file(),
            poll_interval_ms: default_poll_interval_ms(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
            hot_attach_ms: default_hot_attach_ms(),
            memory: MemoryConfig::default(),
            grid: GridConfig::default(),
            planner: PlannerConfig::default(),
            loot: LootConfig::default(),
            log: LogSettings::default(),
        }
    }
}

/// Return the config path: `$SCOUT_CONFIG`, else `./scout.toml`.
pub fn config_path() -> PathBuf {
    config_path_from(|key| std::env::var(key).ok())
}

pub(crate) fn config_path_from(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup("SCOUT_CONFIG")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load the config from a specific path. Returns `None` if the file does not
/// exist. Environment overrides are not applied here.
pub fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply `SCOUT_*` environment variable overrides to `cfg`.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

/// Apply overrides from an arbitrary lookup.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `SCOUT_STATE_FILE` | `state_file` |
/// | `SCOUT_ACTION_FILE` | `action_file` |
/// | `SCOUT_DATA_DIR` | `data_dir` |
/// | `SCOUT_SNAPSHOT_FILE` | `snapshot_file` |
/// | `SCOUT_POLL_INTERVAL_MS` | `poll_interval_ms` |
/// | `SCOUT_SNAPSHOT_INTERVAL_MS` | `snapshot_interval_ms` |
/// | `SCOUT_STATIONARY_TIMEOUT_MS` | `planner.stationary_timeout_ms` |
/// | `SCOUT_INTEREST_THRESHOLD` | `loot.interest_threshold` |
/// | `RUST_LOG`, `SCOUT_LOG_FORMAT`, `OTEL_EXPORTER_OTLP_ENDPOINT` | `log` |
///
/// Values that do not parse are ignored.
pub fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
    if let Some(p) = path("SCOUT_STATE_FILE") {
        cfg.state_file = p;
    }
    if let Some(p) = path("SCOUT_ACTION_FILE") {
        cfg.action_file = p;
    }
    if let Some(p) = path("SCOUT_DATA_DIR") {
        cfg.data_dir = p;
    }
    if let Some(p) = path("SCOUT_SNAPSHOT_FILE") {
        cfg.snapshot_file = p;
    }
    if let Some(v) = lookup("SCOUT_POLL_INTERVAL_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.poll_interval_ms = ms;
    }
    if let Some(v) = lookup("SCOUT_SNAPSHOT_INTERVAL_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.snapshot_interval_ms = ms;
    }
    if let Some(v) = lookup("SCOUT_STATIONARY_TIMEOUT_MS")
        && let Ok(ms) = v.trim().parse::<i64>()
    {
        cfg.planner.stationary_timeout_ms = ms;
    }
    if let Some(v) = lookup("SCOUT_INTEREST_THRESHOLD")
        && let Ok(t) = v.trim().parse::<f64>()
        && t.is_finite()
    {
        cfg.loot.interest_threshold = t;
    }
    cfg.log = std::mem::take(&mut cfg.log).with_overrides(&lookup);
}

/// Write the config to `path`, creating parent directories as needed.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("nested").join("scout.toml");

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, cfg);
        assert_eq!(loaded.memory.container_ttl_ms, None);
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let result = load_from(&dir.path().join("scout.toml")).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("scout.toml");
        fs::write(
            &path,
            r#"
state_file = "/tmp/game/state.json"
poll_interval_ms = 50

[memory]
zombie_ttl_ms = 4000

[loot.item_values]
"Base.Crowbar" = 90.0
"#,
        )
        .unwrap();

        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.state_file, PathBuf::from("/tmp/game/state.json"));
        assert_eq!(cfg.poll_interval_ms, 50);
        assert_eq!(cfg.snapshot_interval_ms, 500);
        assert_eq!(cfg.memory.zombie_ttl_ms, 4_000);
        assert_eq!(cfg.memory.player_ttl_ms, 30_000);
        assert_eq!(cfg.loot.item_values.get("Base.Crowbar"), Some(&90.0));
        assert_eq!(cfg.loot.interest_threshold, 30.0);
        assert_eq!(cfg.planner, PlannerConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("scout.toml");
        fs::write(&path, "poll_interval_ms = \"soon\"").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(err.starts_with("Failed to parse config"));
    }

    #[test]
    fn config_path_defaults_to_working_directory() {
        assert_eq!(config_path_from(lookup(&[])), PathBuf::from("scout.toml"));
        assert_eq!(
            config_path_from(lookup(&[("SCOUT_CONFIG", "/etc/scout/bot.toml")])),
            PathBuf::from("/etc/scout/bot.toml")
        );
    }

    #[test]
    fn overrides_change_paths_and_timing() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup(&[
                ("SCOUT_STATE_FILE", "/game/state.json"),
                ("SCOUT_DATA_DIR", "/var/lib/scout"),
                ("SCOUT_POLL_INTERVAL_MS", "25"),
                ("SCOUT_STATIONARY_TIMEOUT_MS", "4000"),
                ("SCOUT_INTEREST_THRESHOLD", "55.5"),
                ("SCOUT_LOG_FORMAT", "json"),
            ]),
        );
        assert_eq!(cfg.state_file, PathBuf::from("/game/state.json"));
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/scout"));
        assert_eq!(cfg.poll_interval_ms, 25);
        assert_eq!(cfg.planner.stationary_timeout_ms, 4_000);
        assert_eq!(cfg.loot.interest_threshold, 55.5);
        assert_eq!(cfg.log.format, scout_runtime::LogFormat::Json);
    }

    #[test]
    fn overrides_ignore_invalid_numbers() {
        let mut cfg = Config::default();
        apply_overrides(
            &mut cfg,
            lookup(&[
                ("SCOUT_POLL_INTERVAL_MS", "fast"),
                ("SCOUT_SNAPSHOT_INTERVAL_MS", "-1"),
                ("SCOUT_INTEREST_THRESHOLD", "NaN"),
                ("SCOUT_ACTION_FILE", ""),
            ]),
        );
        assert_eq!(cfg, Config::default());
    }
}
