//! YAML configuration for breq
//!
//! Configuration lives in `breq.yaml`. The loader understands two custom tags:
//!
//! - `!include path` - Include another YAML file (e.g. a shared device list)
//! - `!env_var VAR` - Environment variable substitution
//!
//! # Example
//!
//! ```ignore
//! use breq_config::EngineConfig;
//!
//! let config = EngineConfig::load("breq.yaml")?;
//! println!("settle delay: {:?}", config.settle_delay());
//! ```

mod engine_config;
mod error;
mod loader;

pub use engine_config::{DeviceConfig, EngineConfig, DEFAULT_CONFIG_FILE};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, load_yaml_string, YamlLoader};

// Re-export serde_yaml::Value for convenience
pub use serde_yaml::Value;
