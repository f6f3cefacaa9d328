//! Device command gateway
//!
//! The script engine never talks to hardware directly. It hands a device
//! name and a command string to a [`DeviceGateway`] and awaits a
//! [`CommandReply`]. Which transport carries the bytes (UDP, USB serial, a
//! simulator) is the gateway implementation's business.
//!
//! This crate also provides [`DeviceRegistry`], a gateway that routes each
//! command to an async handler registered per device, and the
//! [`DeviceDirectory`] view of which devices are currently reachable.

mod registry;
mod simulated;

pub use registry::{CommandFuture, CommandHandler, DeviceInfo, DeviceRegistry, SharedDeviceRegistry};
pub use simulated::SimulatedDevice;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Result type for gateway calls
pub type GatewayResult = Result<CommandReply, GatewayError>;

/// Errors raised by a gateway before or while delivering a command
///
/// A device that received the command and refused it is not an error at
/// this level; that is a [`CommandReply`] with `success: false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("unknown device: {0}")]
    UnknownDevice(String),

    #[error("device not connected: {0}")]
    NotConnected(String),

    #[error("no command provided")]
    EmptyCommand,

    #[error("transport error: {0}")]
    Transport(String),
}

/// A command addressed to one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub device: String,
    pub command: String,
}

impl CommandRequest {
    pub fn new(device: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            command: command.into(),
        }
    }
}

/// Reply from a device to a single command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandReply {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// How a device is physically attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMethod {
    #[default]
    Network,
    Usb,
    /// In-process stand-in with no hardware behind it
    Simulated,
}

/// Asynchronous command dispatch to devices
#[async_trait]
pub trait DeviceGateway: Send + Sync {
    /// Deliver `command` to `device` and wait for its reply
    async fn send(&self, device: &str, command: &str) -> GatewayResult;
}

#[async_trait]
impl<G: DeviceGateway + ?Sized> DeviceGateway for Arc<G> {
    async fn send(&self, device: &str, command: &str) -> GatewayResult {
        (**self).send(device, command).await
    }
}

/// Read-only view of which devices are reachable right now
///
/// Owned and mutated by whatever tracks connectivity; consumers only read.
pub trait DeviceDirectory: Send + Sync {
    /// Names of all currently connected devices, sorted
    fn connected_devices(&self) -> Vec<String>;

    /// Whether `device` is connected right now
    fn is_connected(&self, device: &str) -> bool;

    fn has_any(&self) -> bool {
        !self.connected_devices().is_empty()
    }
}

impl<D: DeviceDirectory + ?Sized> DeviceDirectory for Arc<D> {
    fn connected_devices(&self) -> Vec<String> {
        (**self).connected_devices()
    }

    fn is_connected(&self, device: &str) -> bool {
        (**self).is_connected(device)
    }
}

/// A fixed snapshot of connected devices
impl DeviceDirectory for BTreeSet<String> {
    fn connected_devices(&self) -> Vec<String> {
        self.iter().cloned().collect()
    }

    fn is_connected(&self, device: &str) -> bool {
        self.contains(device)
    }
}

impl DeviceDirectory for HashSet<String> {
    fn connected_devices(&self) -> Vec<String> {
        let mut devices: Vec<_> = self.iter().cloned().collect();
        devices.sort();
        devices
    }

    fn is_connected(&self, device: &str) -> bool {
        self.contains(device)
    }
}
