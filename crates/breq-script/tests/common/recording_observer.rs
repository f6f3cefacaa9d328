//! Observer that captures every notification in order

use breq_core::{LogEvent, LogKind, RunState};
use breq_script::RunObserver;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Cursor(Option<usize>),
    State(RunState),
    Log(LogEvent),
}

#[derive(Default)]
pub struct RecordingObserver {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<RunState> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::State(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn cursors(&self) -> Vec<Option<usize>> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Cursor(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn logs(&self) -> Vec<LogEvent> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Log(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn logs_of(&self, kind: LogKind) -> Vec<LogEvent> {
        self.logs().into_iter().filter(|e| e.kind == kind).collect()
    }
}

impl RunObserver for RecordingObserver {
    fn on_cursor_change(&self, line: Option<usize>) {
        self.notifications
            .lock()
            .unwrap()
            .push(Notification::Cursor(line));
    }

    fn on_run_state_change(&self, state: RunState) {
        self.notifications
            .lock()
            .unwrap()
            .push(Notification::State(state));
    }

    fn log(&self, event: &LogEvent) {
        self.notifications
            .lock()
            .unwrap()
            .push(Notification::Log(event.clone()));
    }
}
