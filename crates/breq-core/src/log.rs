//! Operator-facing log events
//!
//! These are what the terminal panel shows while a script runs. They are
//! separate from `tracing` output, which is for developers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Info,
    /// A command was handed to the gateway
    Sent,
    /// A device acknowledged a command, or the run completed
    Success,
    Warning,
    Error,
    Pause,
    Stop,
}

impl LogKind {
    /// Label used when rendering to a terminal
    pub fn label(&self) -> &'static str {
        match self {
            LogKind::Info => "INFO",
            LogKind::Sent => "SENT",
            LogKind::Success => "OK",
            LogKind::Warning => "WARNING",
            LogKind::Error => "ERROR",
            LogKind::Pause => "PAUSE",
            LogKind::Stop => "STOP",
        }
    }
}

impl std::fmt::Display for LogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single log event emitted by the execution controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: LogKind,

    pub message: String,

    /// Device the event concerns, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// 0-based script line the event concerns, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            device: None,
            line: None,
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogKind::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogKind::Error, message)
    }

    /// Attach the device this event concerns
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Attach the script line this event concerns
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Render as a single terminal line, e.g. `12:04:55 [SENT] alpha: home`
    pub fn render(&self) -> String {
        let time = self.timestamp.format("%H:%M:%S");
        match &self.device {
            Some(device) => format!("{} [{}] {}: {}", time, self.kind, device, self.message),
            None => format!("{} [{}] {}", time, self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let event = LogEvent::new(LogKind::Sent, "move 10 20")
            .with_device("beta")
            .at_line(2);
        assert_eq!(event.kind, LogKind::Sent);
        assert_eq!(event.device.as_deref(), Some("beta"));
        assert_eq!(event.line, Some(2));
        assert!(event.render().ends_with("[SENT] beta: move 10 20"));
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let event = LogEvent::warning("unrecognized line");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "warning");
        assert!(json.get("device").is_none());
    }
}
