//! Run notification sinks
//!
//! The executor reports every cursor move, state transition and operator log
//! message to a [`RunObserver`]. Calls happen synchronously, in order, on the
//! task driving the run, so observers must not block.

use breq_core::events::{CursorChangedData, RunStateChangedData};
use breq_core::{Context, LogEvent, LogKind, RunState};
use breq_event_bus::EventBus;
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};

/// Receives progress notifications from a run
pub trait RunObserver: Send + Sync {
    /// A new run is about to enter `Running`
    fn on_run_started(&self, _context: &Context) {}

    /// The executing line changed; `None` when nothing is executing
    fn on_cursor_change(&self, line: Option<usize>);

    fn on_run_state_change(&self, state: RunState);

    fn log(&self, event: &LogEvent);
}

impl<O: RunObserver + ?Sized> RunObserver for Arc<O> {
    fn on_run_started(&self, context: &Context) {
        (**self).on_run_started(context)
    }

    fn on_cursor_change(&self, line: Option<usize>) {
        (**self).on_cursor_change(line)
    }

    fn on_run_state_change(&self, state: RunState) {
        (**self).on_run_state_change(state)
    }

    fn log(&self, event: &LogEvent) {
        (**self).log(event)
    }
}

/// Fan-out to several observers in registration order
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn RunObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: Arc<dyn RunObserver>) {
        self.observers.push(observer);
    }

    pub fn with(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl RunObserver for ObserverSet {
    fn on_run_started(&self, context: &Context) {
        for observer in &self.observers {
            observer.on_run_started(context);
        }
    }

    fn on_cursor_change(&self, line: Option<usize>) {
        for observer in &self.observers {
            observer.on_cursor_change(line);
        }
    }

    fn on_run_state_change(&self, state: RunState) {
        for observer in &self.observers {
            observer.on_run_state_change(state);
        }
    }

    fn log(&self, event: &LogEvent) {
        for observer in &self.observers {
            observer.log(event);
        }
    }
}

/// Mirrors operator log events into `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_cursor_change(&self, _line: Option<usize>) {}

    fn on_run_state_change(&self, state: RunState) {
        info!(%state, "Run state changed");
    }

    fn log(&self, event: &LogEvent) {
        let device = event.device.as_deref().unwrap_or("-");
        match event.kind {
            LogKind::Error => error!(device, line = ?event.line, "{}", event.message),
            LogKind::Warning => warn!(device, line = ?event.line, "{}", event.message),
            _ => info!(device, line = ?event.line, kind = %event.kind, "{}", event.message),
        }
    }
}

/// Publishes run notifications as events on an [`EventBus`]
pub struct BusObserver {
    bus: Arc<EventBus>,
    /// Context of the run in progress, stamped on every event
    context: RwLock<Context>,
}

impl BusObserver {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            context: RwLock::new(Context::new()),
        }
    }

    fn context(&self) -> Context {
        self.context
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl RunObserver for BusObserver {
    fn on_run_started(&self, context: &Context) {
        if let Ok(mut current) = self.context.write() {
            *current = context.clone();
        }
    }

    fn on_cursor_change(&self, line: Option<usize>) {
        self.bus
            .fire_typed(CursorChangedData { line }, self.context());
    }

    fn on_run_state_change(&self, state: RunState) {
        self.bus
            .fire_typed(RunStateChangedData { state }, self.context());
    }

    fn log(&self, event: &LogEvent) {
        self.bus.fire_typed(event.clone(), self.context());
    }
}
