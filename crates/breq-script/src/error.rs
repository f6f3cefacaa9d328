//! Error types for the script engine
//!
//! Only failures that prevent a run from starting are errors. Everything
//! that happens once a run is underway ends up in the [`RunOutcome`] and
//! the operator log instead.
//!
//! [`RunOutcome`]: breq_core::RunOutcome

use breq_core::RunState;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the run control surface
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no device connected")]
    NoDeviceConnected,

    #[error("a run is already active; stop it first")]
    RunAlreadyActive,

    #[error("cannot reset while {state}")]
    NotResettable { state: RunState },

    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Errors loading a script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for run control
pub type RunResult<T> = Result<T, RunError>;
