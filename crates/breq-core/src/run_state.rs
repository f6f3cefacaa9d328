//! Run state machine
//!
//! Enforces valid state transitions for a script run:
//!
//! ```text
//! Idle → Running → Completed
//!              ↘ Paused → Running (continue)
//!              ↘ Failed
//! Running/Paused → Stopping → Stopped
//! Completed/Stopped/Failed → Idle (reset)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of a script run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No run has started, or the last one was reset
    #[default]
    Idle,
    Running,
    /// Suspended at a single-block pause point
    Paused,
    /// Cancellation observed, winding down
    Stopping,
    /// Cancelled by the operator (terminal)
    Stopped,
    /// Reached end of script (terminal)
    Completed,
    /// Aborted by a fatal error (terminal)
    Failed,
}

impl RunState {
    /// Whether a run is in flight in this state
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunState::Running | RunState::Paused | RunState::Stopping
        )
    }

    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Stopped | RunState::Completed | RunState::Failed
        )
    }

    /// Attempt a transition to a new state.
    ///
    /// Returns the new state if valid, or an error describing why the
    /// transition is invalid.
    pub fn try_transition(self, to: RunState) -> Result<RunState, InvalidTransition> {
        use RunState::*;

        let valid = match (self, to) {
            (Idle, Running) => true,

            (Running, Paused) => true,
            (Running, Completed) => true,
            (Running, Failed) => true,
            (Running, Stopping) => true,

            (Paused, Running) => true,
            (Paused, Stopping) => true,
            (Paused, Failed) => true,

            (Stopping, Stopped) => true,
            (Stopping, Failed) => true,

            (Completed, Idle) | (Stopped, Idle) | (Failed, Idle) => true,

            _ => false,
        };

        if valid {
            Ok(to)
        } else {
            Err(InvalidTransition {
                from: self,
                to,
                reason: Self::transition_error_reason(self, to),
            })
        }
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition_to(self, to: RunState) -> bool {
        self.try_transition(to).is_ok()
    }

    fn transition_error_reason(from: RunState, to: RunState) -> &'static str {
        use RunState::*;

        match (from, to) {
            (Idle, _) => "no run in progress - must start Running first",
            (Running, Idle) | (Paused, Idle) | (Stopping, Idle) => {
                "run in progress - stop it before resetting"
            }
            (Stopping, Running) | (Stopping, Paused) => "stop already requested",
            (Paused, Completed) => "cannot complete while paused - continue first",
            (Completed, _) | (Stopped, _) | (Failed, _) => {
                "run has ended - only a reset to Idle is allowed"
            }
            _ => "invalid state transition",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Stopping => "stopping",
            RunState::Stopped => "stopped",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid run state transition from {from:?} to {to:?}: {reason}")]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
    pub reason: &'static str,
}

/// How a run advances through the script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Execute every line without stopping
    #[default]
    Continuous,
    /// Pause after each executed line until continued
    SingleBlock,
}

/// Terminal result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Stopped,
    Failed { reason: String },
}

impl RunOutcome {
    /// The terminal RunState this outcome corresponds to
    pub fn state(&self) -> RunState {
        match self {
            RunOutcome::Completed => RunState::Completed,
            RunOutcome::Stopped => RunState::Stopped,
            RunOutcome::Failed { .. } => RunState::Failed,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}
