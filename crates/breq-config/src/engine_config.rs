//! Engine configuration
//!
//! Parsed from `breq.yaml`:
//!
//! ```yaml
//! settle_delay_ms: 100
//! command_timeout_ms: 10000
//! log_buffer_size: 1000
//! mode: continuous
//! devices:
//!   - name: alpha
//!   - name: beta
//!     latency_ms: 40
//!     reject: [eject]
//! ```

use breq_core::RunMode;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::YamlLoader;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "breq.yaml";

/// Configuration of the script engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Pause inserted after every device command
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Upper bound on a single gateway call; 0 disables the bound
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Number of operator log entries kept in memory
    #[serde(default = "default_log_buffer_size")]
    pub log_buffer_size: usize,

    /// Run mode used when the caller does not pick one
    #[serde(default)]
    pub mode: RunMode,

    /// Devices to register at startup
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// A device registered at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub name: String,

    /// Simulated reply latency
    #[serde(default)]
    pub latency_ms: u64,

    /// Command names the simulated device refuses
    #[serde(default)]
    pub reject: Vec<String>,

    /// Whether the device starts out connected
    #[serde(default = "default_connected")]
    pub connected: bool,
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_command_timeout_ms() -> u64 {
    10_000
}

fn default_log_buffer_size() -> usize {
    1000
}

fn default_connected() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            log_buffer_size: default_log_buffer_size(),
            mode: RunMode::default(),
            devices: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Load and validate configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let yaml = YamlLoader::new(base_dir).load_file(path)?;

        Self::from_yaml(&yaml)
    }

    /// Load from `path` if it exists, otherwise return defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Parse configuration from a YAML value
    pub fn from_yaml(yaml: &Value) -> ConfigResult<Self> {
        let config: EngineConfig = match yaml {
            // An empty file parses as null
            Value::Null => EngineConfig::default(),
            Value::Mapping(_) => {
                serde_yaml::from_value(yaml.clone()).map_err(|e| ConfigError::Invalid {
                    key: "breq.yaml".to_string(),
                    reason: e.to_string(),
                })?
            }
            _ => {
                return Err(ConfigError::Invalid {
                    key: "breq.yaml".to_string(),
                    reason: "expected a mapping of settings".to_string(),
                })
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.log_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                key: "log_buffer_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for device in &self.devices {
            let name = device.name.as_str();
            if name.is_empty() || name.contains(char::is_whitespace) || name.contains('.') {
                return Err(ConfigError::Device {
                    name: device.name.clone(),
                    reason: "name must be one word without '.'".to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(ConfigError::Device {
                    name: device.name.clone(),
                    reason: "listed more than once".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Gateway call bound, `None` when disabled
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_ms > 0).then(|| Duration::from_millis(self.command_timeout_ms))
    }
}

impl DeviceConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}
