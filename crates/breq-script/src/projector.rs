//! Latest run state for display
//!
//! [`RunProjector`] keeps the most recent [`RunSnapshot`] in a `watch`
//! channel. UI layers either poll [`RunProjector::snapshot`] or await
//! changes on a receiver from [`RunProjector::subscribe`].

use crate::observer::RunObserver;
use breq_core::{LogEvent, RunState};
use serde::Serialize;
use tokio::sync::watch;

/// State and cursor at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSnapshot {
    pub state: RunState,
    /// 0-based line being executed or paused on
    pub cursor: Option<usize>,
}

impl RunSnapshot {
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == RunState::Paused
    }
}

#[derive(Debug)]
pub struct RunProjector {
    tx: watch::Sender<RunSnapshot>,
}

impl RunProjector {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunSnapshot::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> RunState {
        self.tx.borrow().state
    }

    pub fn cursor(&self) -> Option<usize> {
        self.tx.borrow().cursor
    }

    pub fn is_running(&self) -> bool {
        self.snapshot().is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.snapshot().is_paused()
    }
}

impl Default for RunProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl RunObserver for RunProjector {
    fn on_cursor_change(&self, line: Option<usize>) {
        self.tx.send_if_modified(|snapshot| {
            let changed = snapshot.cursor != line;
            snapshot.cursor = line;
            changed
        });
    }

    fn on_run_state_change(&self, state: RunState) {
        self.tx.send_if_modified(|snapshot| {
            let changed = snapshot.state != state;
            snapshot.state = state;
            changed
        });
    }

    fn log(&self, _event: &LogEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_idle() {
        let projector = RunProjector::new();
        assert_eq!(projector.snapshot(), RunSnapshot::default());
        assert_eq!(projector.state(), RunState::Idle);
        assert_eq!(projector.cursor(), None);
        assert!(!projector.is_running());
    }

    #[test]
    fn test_tracks_updates() {
        let projector = RunProjector::new();
        projector.on_run_state_change(RunState::Running);
        projector.on_cursor_change(Some(2));
        assert!(projector.is_running());
        assert_eq!(projector.cursor(), Some(2));

        projector.on_run_state_change(RunState::Paused);
        assert!(projector.is_paused());
        assert!(!projector.is_running());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let projector = RunProjector::new();
        let mut rx = projector.subscribe();

        projector.on_run_state_change(RunState::Running);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().state, RunState::Running);

        // Same value again is not a change
        projector.on_run_state_change(RunState::Running);
        assert!(!rx.has_changed().unwrap());
    }
}
