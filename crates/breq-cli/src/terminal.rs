//! Operator output on stdout

use breq_core::{LogEvent, RunState};
use breq_script::{RunObserver, Script};

/// Echoes each executed line and every log event
pub struct TerminalObserver {
    script: Script,
}

impl TerminalObserver {
    pub fn new(script: Script) -> Self {
        Self { script }
    }
}

impl RunObserver for TerminalObserver {
    fn on_cursor_change(&self, line: Option<usize>) {
        if let Some(index) = line {
            let text = self.script.line(index).unwrap_or_default().trim();
            println!("{:>4} | {}", index + 1, text);
        }
    }

    fn on_run_state_change(&self, state: RunState) {
        if state == RunState::Paused {
            println!("       (Enter to continue, Ctrl-C to stop)");
        }
    }

    fn log(&self, event: &LogEvent) {
        println!("{}", event.render());
    }
}
