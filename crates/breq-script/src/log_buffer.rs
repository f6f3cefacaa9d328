//! Bounded in-memory operator log
//!
//! Keeps the most recent log events so a UI that attaches mid-run can show
//! what already happened. Oldest entries are dropped once the buffer is full.

use crate::observer::RunObserver;
use breq_core::{LogEvent, RunState};
use std::collections::VecDeque;
use std::sync::RwLock;

/// Default number of entries kept
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

#[derive(Debug)]
pub struct LogBuffer {
    entries: RwLock<VecDeque<LogEvent>>,
    capacity: usize,
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY))),
            capacity,
        }
    }

    pub fn push(&self, event: LogEvent) {
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(event);
        }
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Vec<LogEvent> {
        self.entries
            .read()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The newest `count` entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<LogEvent> {
        self.entries
            .read()
            .map(|e| e.iter().skip(e.len().saturating_sub(count)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl RunObserver for LogBuffer {
    fn on_cursor_change(&self, _line: Option<usize>) {}

    fn on_run_state_change(&self, _state: RunState) {}

    fn log(&self, event: &LogEvent) {
        self.push(event.clone());
    }
}
