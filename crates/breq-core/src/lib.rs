//! Core types for breq
//!
//! This crate provides the fundamental types shared by the script engine,
//! the device gateway and the notification layer: RunState, RunMode,
//! RunOutcome, LogEvent, Event and Context.

mod context;
mod event;
mod log;
mod run_state;

pub use context::Context;
pub use event::{Event, EventData, EventType};
pub use log::{LogEvent, LogKind};
pub use run_state::{InvalidTransition, RunMode, RunOutcome, RunState};

/// File extension used for script files
pub const SCRIPT_EXTENSION: &str = "breq";

/// Standard event types fired by a script run
pub mod events {
    use super::*;

    /// Event type for run state transitions
    pub const RUN_STATE_CHANGED: &str = "run_state_changed";

    /// Event type for cursor movement
    pub const CURSOR_CHANGED: &str = "cursor_changed";

    /// Event type for operator-facing log messages
    pub const SCRIPT_LOG: &str = "script_log";

    /// Data for RUN_STATE_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct RunStateChangedData {
        pub state: RunState,
    }

    impl EventData for RunStateChangedData {
        fn event_type() -> &'static str {
            RUN_STATE_CHANGED
        }
    }

    /// Data for CURSOR_CHANGED events
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct CursorChangedData {
        /// 0-based line index, `None` when nothing is executing
        pub line: Option<usize>,
    }

    impl EventData for CursorChangedData {
        fn event_type() -> &'static str {
            CURSOR_CHANGED
        }
    }

    impl EventData for LogEvent {
        fn event_type() -> &'static str {
            SCRIPT_LOG
        }
    }
}
