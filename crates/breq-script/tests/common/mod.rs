//! Common test utilities for the script engine
//!
//! Provides a test bench wiring a [`ScriptRunner`] to a recording gateway
//! and a recording observer so tests can assert on what was sent and what
//! was reported.

#![allow(dead_code)]

mod mock_gateway;
mod recording_observer;
mod test_bench;

pub use mock_gateway::*;
pub use recording_observer::*;
pub use test_bench::*;
