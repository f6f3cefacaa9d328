//! Script Engine
//!
//! This crate provides the execution engine for `.breq` device automation
//! scripts. A script is a list of lines; each line is classified into an
//! [`Instruction`] and executed in order against connected devices.
//!
//! # Instruction Types
//!
//! - `wait <seconds>` - Delay
//! - `<device>.<command> [args...]` - Device command, dispatched through a gateway
//! - `# comment` and blank lines - Ignored
//!
//! # Key Types
//!
//! - [`Script`] - Immutable script text split into lines
//! - [`ScriptExecutor`] - Runs one script to a terminal [`RunOutcome`]
//! - [`ScriptRunner`] - Control surface: start, stop, continue, reset
//! - [`RunObserver`] - Notification sink for cursor, state and log events
//! - [`RunProjector`] / [`LogBuffer`] - Observers that keep the latest state and log

pub mod error;
pub mod executor;
pub mod instruction;
pub mod log_buffer;
pub mod observer;
pub mod projector;
pub mod runner;
pub mod script;

pub use breq_core::{LogEvent, LogKind, RunMode, RunOutcome, RunState};
pub use error::{RunError, RunResult, ScriptError};
pub use executor::{ExecutorSettings, ScriptExecutor};
pub use instruction::{classify, DeviceCommand, Instruction, UnrecognizedReason};
pub use log_buffer::LogBuffer;
pub use observer::{BusObserver, ObserverSet, RunObserver, TracingObserver};
pub use projector::{RunProjector, RunSnapshot};
pub use runner::{RunHandle, RunSignals, ScriptRunner};
pub use script::Script;
