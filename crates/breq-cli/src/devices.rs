//! Device setup for the command-line runner
//!
//! Without hardware attached every device is simulated: configured devices
//! get their latency and rejection list, `--device` names get defaults.

use anyhow::{bail, Result};
use breq_config::EngineConfig;
use breq_gateway::{DeviceRegistry, SimulatedDevice};
use tracing::{debug, warn};

pub fn build_registry(config: &EngineConfig, extra: &[String]) -> Result<DeviceRegistry> {
    let registry = DeviceRegistry::new();

    for device in &config.devices {
        SimulatedDevice {
            latency: device.latency(),
            reject: device.reject.clone(),
        }
        .register(&registry, &device.name);

        if !device.connected {
            registry.set_connected(&device.name, false);
        }
        debug!(device = %device.name, connected = device.connected, "Registered device");
    }

    for name in extra {
        if name.is_empty() || name.contains(char::is_whitespace) || name.contains('.') {
            bail!("invalid device name '{}'", name);
        }
        if registry.is_registered(name) {
            warn!(device = %name, "Device already configured, ignoring --device");
            continue;
        }
        SimulatedDevice::default().register(&registry, name);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use breq_config::DeviceConfig;
    use breq_gateway::DeviceDirectory;

    fn device(name: &str, connected: bool) -> DeviceConfig {
        DeviceConfig {
            name: name.to_string(),
            latency_ms: 0,
            reject: Vec::new(),
            connected,
        }
    }

    #[test]
    fn test_config_and_flag_devices() {
        let config = EngineConfig {
            devices: vec![device("alpha", true), device("beta", false)],
            ..EngineConfig::default()
        };

        let registry = build_registry(&config, &["gamma".to_string(), "alpha".to_string()]).unwrap();

        assert_eq!(registry.device_count(), 3);
        assert_eq!(registry.connected_devices(), vec!["alpha", "gamma"]);
        assert!(!registry.is_connected("beta"));
    }

    #[test]
    fn test_invalid_flag_device() {
        let result = build_registry(&EngineConfig::default(), &["alpha.one".to_string()]);
        assert!(result.is_err());
    }
}
