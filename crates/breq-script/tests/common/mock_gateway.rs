//! Gateway that records every command it is handed

use async_trait::async_trait;
use breq_gateway::{CommandReply, DeviceGateway, GatewayResult};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// A command as seen by the gateway
#[derive(Debug, Clone)]
pub struct SentCommand {
    pub device: String,
    pub command: String,
    pub at: Instant,
}

/// Acknowledges everything after an optional latency, recording each call
#[derive(Default)]
pub struct RecordingGateway {
    latency: Duration,
    sent: Mutex<Vec<SentCommand>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// `(device, command)` pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|c| (c.device.clone(), c.command.clone()))
            .collect()
    }

    pub fn sent_commands(&self) -> Vec<SentCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl DeviceGateway for RecordingGateway {
    async fn send(&self, device: &str, command: &str) -> GatewayResult {
        self.sent.lock().unwrap().push(SentCommand {
            device: device.to_string(),
            command: command.to_string(),
            at: Instant::now(),
        });

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(CommandReply::ok())
    }
}

/// Expected `(device, command)` pairs
pub fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(d, c)| (d.to_string(), c.to_string()))
        .collect()
}
