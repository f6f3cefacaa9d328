//! In-process device stand-in
//!
//! Used by the CLI when no hardware is attached, and by tests. A simulated
//! device acknowledges every command after a fixed latency, except commands
//! whose first word is listed in `reject`.

use crate::{CommandReply, CommandRequest, ConnectionMethod, DeviceRegistry, GatewayResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct SimulatedDevice {
    /// Time taken to reply to each command
    pub latency: Duration,
    /// Command names this device refuses
    pub reject: Vec<String>,
}

impl SimulatedDevice {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            reject: Vec::new(),
        }
    }

    pub fn rejecting(mut self, command: impl Into<String>) -> Self {
        self.reject.push(command.into());
        self
    }

    /// Handle one command the way the device would
    pub async fn handle(&self, request: CommandRequest) -> GatewayResult {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let name = request.command.split_whitespace().next().unwrap_or_default();
        if self.reject.iter().any(|r| r == name) {
            return Ok(CommandReply::rejected(format!(
                "{} rejected '{}'",
                request.device, name
            )));
        }

        info!(device = %request.device, "[CMD SENT to {}]: {}", request.device.to_uppercase(), request.command);
        Ok(CommandReply::ok())
    }

    /// Register this simulated device under `name`
    pub fn register(self, registry: &DeviceRegistry, name: impl Into<String>) {
        let device = Arc::new(self);
        registry.register(name, ConnectionMethod::Simulated, move |req| {
            let device = device.clone();
            async move { device.handle(req).await }
        });
    }
}
