//! Configuration vault – reads/writes `~/.heatseek/config.toml`.
//!
//! Every table is optional; missing keys fall back to the reference
//! defaults.
//!
//! ```toml
//! bus_capacity = 256
//!
//! [thresholds]
//! front_launch = 33.0
//! front_forward = 29.0
//! side_threshold = 26.0
//!
//! [loop]
//! tick_interval_ms = 1000
//! publish_temperature_map = false
//!
//! [pins]
//! servo = 5
//!
//! [launch]
//! step_interval_ms = 1000
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use heatseek_hal::{LaunchProfile, PinMap};
use heatseek_runtime::LoopConfig;
use heatseek_types::{HeatError, Thresholds};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Persisted configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Buffered events per bus topic.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default, rename = "loop")]
    pub control: LoopConfig,

    #[serde(default)]
    pub pins: PinMap,

    #[serde(default)]
    pub launch: LaunchProfile,
}

fn default_bus_capacity() -> usize {
    256
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus_capacity: default_bus_capacity(),
            thresholds: Thresholds::default(),
            control: LoopConfig::default(),
            pins: PinMap::default(),
            launch: LaunchProfile::default(),
        }
    }
}

impl Config {
    /// Check every section; the first violation wins.
    ///
    /// # Errors
    ///
    /// Returns [`HeatError::Config`].
    pub fn validate(&self) -> Result<(), HeatError> {
        if self.bus_capacity == 0 {
            return Err(HeatError::Config("bus_capacity must be > 0".to_string()));
        }
        self.thresholds.validate()?;
        self.control.validate()?;
        self.pins.validate()?;
        self.launch.validate()
    }
}

/// Return the path to `~/.heatseek/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".heatseek").join("config.toml")
}

/// Load `path` (or the default location), apply `HEATSEEK_*` overrides and
/// validate.  A missing file at the default location yields the defaults; a
/// missing file that was named explicitly is an error.
///
/// # Errors
///
/// Returns [`HeatError::Config`] if the file cannot be read or parsed, or if
/// the result fails validation.
pub fn resolve(explicit: Option<&Path>) -> Result<Config, HeatError> {
    let mut cfg = match explicit {
        Some(path) => load_from(path)?.ok_or_else(|| {
            HeatError::Config(format!("config file {} does not exist", path.display()))
        })?,
        None => load_from(&config_path())?.unwrap_or_default(),
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if the file does
/// not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, HeatError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        HeatError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| HeatError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `HEATSEEK_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `HEATSEEK_TICK_MS` | `loop.tick_interval_ms` |
/// | `HEATSEEK_STEP_MS` | `launch.step_interval_ms` |
/// | `HEATSEEK_FRONT_LAUNCH` | `thresholds.front_launch` |
/// | `HEATSEEK_FRONT_FORWARD` | `thresholds.front_forward` |
/// | `HEATSEEK_SIDE_THRESHOLD` | `thresholds.side_threshold` |
///
/// Unparseable values are ignored with a warning.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    override_with(&lookup, "HEATSEEK_TICK_MS", &mut cfg.control.tick_interval_ms);
    override_with(&lookup, "HEATSEEK_STEP_MS", &mut cfg.launch.step_interval_ms);
    override_with(&lookup, "HEATSEEK_FRONT_LAUNCH", &mut cfg.thresholds.front_launch);
    override_with(&lookup, "HEATSEEK_FRONT_FORWARD", &mut cfg.thresholds.front_forward);
    override_with(&lookup, "HEATSEEK_SIDE_THRESHOLD", &mut cfg.thresholds.side_threshold);
}

fn override_with<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *field = value,
        Err(_) => warn!(key, value = %raw, "ignoring unparseable override"),
    }
}

/// Save the config to `path`, creating parent directories if necessary.
///
/// # Errors
///
/// Returns [`HeatError::Config`] if the file cannot be written.
pub fn save_to(cfg: &Config, path: &Path) -> Result<(), HeatError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| HeatError::Config(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| HeatError::Serialization(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        HeatError::Config(format!("failed to write config at {}: {e}", path.display()))
    })
}
