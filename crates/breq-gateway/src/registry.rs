//! Registry of devices and their command handlers

use crate::{
    CommandRequest, ConnectionMethod, DeviceDirectory, DeviceGateway, GatewayError, GatewayResult,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Future type for async command handlers
pub type CommandFuture = Pin<Box<dyn Future<Output = GatewayResult> + Send>>;

/// Command handler function type
pub type CommandHandler = Arc<dyn Fn(CommandRequest) -> CommandFuture + Send + Sync>;

/// Public description of a registered device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub connection: ConnectionMethod,
    pub connected: bool,
}

struct RegisteredDevice {
    handler: CommandHandler,
    info: DeviceInfo,
}

/// The device registry routes commands to per-device handlers
///
/// The DeviceRegistry is responsible for:
/// - Registering devices with the handler that talks to their transport
/// - Tracking which registered devices are currently connected
/// - Dispatching commands to the right handler
pub struct DeviceRegistry {
    devices: DashMap<String, RegisteredDevice>,
}

impl DeviceRegistry {
    /// Create a new empty device registry
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
        }
    }

    /// Register a device
    ///
    /// Devices start out connected. Registering an existing name replaces
    /// its handler.
    #[instrument(skip(self, name, handler))]
    pub fn register<F, Fut>(&self, name: impl Into<String>, connection: ConnectionMethod, handler: F)
    where
        F: Fn(CommandRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = GatewayResult> + Send + 'static,
    {
        let name = name.into();
        debug!(device = %name, ?connection, "Registering device");

        let handler: CommandHandler = Arc::new(move |req| Box::pin(handler(req)) as CommandFuture);

        self.devices.insert(
            name.clone(),
            RegisteredDevice {
                handler,
                info: DeviceInfo {
                    name,
                    connection,
                    connected: true,
                },
            },
        );
    }

    /// Mark a device as connected or disconnected
    ///
    /// Returns false if the device is not registered.
    pub fn set_connected(&self, name: &str, connected: bool) -> bool {
        match self.devices.get_mut(name) {
            Some(mut device) => {
                if device.info.connected != connected {
                    debug!(device = %name, connected, "Device connectivity changed");
                }
                device.info.connected = connected;
                true
            }
            None => false,
        }
    }

    /// Unregister a device
    #[instrument(skip(self))]
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.devices.remove(name).is_some();
        if removed {
            debug!(device = %name, "Unregistered device");
        }
        removed
    }

    /// Check if a device is registered, connected or not
    pub fn is_registered(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    /// Get a device description
    pub fn device(&self, name: &str) -> Option<DeviceInfo> {
        self.devices.get(name).map(|d| d.info.clone())
    }

    /// All registered devices, sorted by name
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let mut devices: Vec<_> = self.devices.iter().map(|d| d.info.clone()).collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceGateway for DeviceRegistry {
    #[instrument(skip(self))]
    async fn send(&self, device: &str, command: &str) -> GatewayResult {
        if command.trim().is_empty() {
            return Err(GatewayError::EmptyCommand);
        }

        let registered = self.devices.get(device).ok_or_else(|| {
            warn!(device = %device, "Device not found");
            GatewayError::UnknownDevice(device.to_string())
        })?;

        if !registered.info.connected {
            return Err(GatewayError::NotConnected(device.to_string()));
        }

        let handler = registered.handler.clone();
        drop(registered); // Release the shard lock before awaiting the handler

        debug!(device = %device, command = %command, "Dispatching command");
        handler(CommandRequest::new(device, command)).await
    }
}

impl DeviceDirectory for DeviceRegistry {
    fn connected_devices(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .devices
            .iter()
            .filter(|d| d.info.connected)
            .map(|d| d.info.name.clone())
            .collect();
        names.sort();
        names
    }

    fn is_connected(&self, device: &str) -> bool {
        self.devices
            .get(device)
            .map(|d| d.info.connected)
            .unwrap_or(false)
    }
}

/// Thread-safe wrapper for DeviceRegistry
pub type SharedDeviceRegistry = Arc<DeviceRegistry>;
