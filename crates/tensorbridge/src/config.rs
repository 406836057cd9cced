//! Process-wide bridge configuration.
//!
//! Values come from an optional JSON file named by `TENSORBRIDGE_CONFIG`, then
//! individual environment variables override single fields.

use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::tensor::Device;

pub const CONFIG_PATH_VAR: &str = "TENSORBRIDGE_CONFIG";
pub const ENGINE_VAR: &str = "TENSORBRIDGE_ENGINE";
pub const ACCELERATOR_INDEX_VAR: &str = "TENSORBRIDGE_ACCELERATOR_INDEX";
pub const EMULATE_ACCELERATOR_VAR: &str = "TENSORBRIDGE_EMULATE_ACCELERATOR";

pub const DEFAULT_ENGINE: &str = "ref-cpu";

static GLOBAL_CONFIG: OnceLock<BridgeConfig> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Registry name of the engine used by factory functions.
    pub engine: String,
    /// Ordinal targeted by `cuda()`.
    pub accelerator_index: usize,
    /// Whether the reference engine emulates an accelerator device.
    pub emulate_accelerator: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            accelerator_index: 0,
            emulate_accelerator: true,
        }
    }
}

impl BridgeConfig {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads the file named by `TENSORBRIDGE_CONFIG` (if any), then applies
    /// environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        base.with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides looked up by variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(engine) = get(ENGINE_VAR) {
            self.engine = engine.trim().to_string();
        }
        if let Some(index) = get(ACCELERATOR_INDEX_VAR) {
            self.accelerator_index = index.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ACCELERATOR_INDEX_VAR,
                value: index.clone(),
            })?;
        }
        if let Some(flag) = get(EMULATE_ACCELERATOR_VAR) {
            self.emulate_accelerator = parse_bool(&flag).ok_or(ConfigError::InvalidValue {
                key: EMULATE_ACCELERATOR_VAR,
                value: flag.clone(),
            })?;
        }
        Ok(self)
    }

    /// Device targeted by accelerator transfers.
    pub fn accelerator_device(&self) -> Device {
        Device::Cuda(self.accelerator_index)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// The configuration loaded on first use. Invalid configuration falls back to
/// defaults with a warning rather than failing every bridge call.
pub fn global() -> &'static BridgeConfig {
    GLOBAL_CONFIG.get_or_init(|| match BridgeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(error = %err, "ignoring invalid tensorbridge configuration");
            BridgeConfig::default()
        }
    })
}
