//! Run control surface
//!
//! [`ScriptRunner`] is what a UI or CLI holds on to. It starts at most one
//! run at a time on a tokio task and forwards stop and continue requests
//! to it through [`RunSignals`].

use crate::error::{RunError, RunResult};
use crate::executor::{panic_message, ExecutorSettings, ScriptExecutor};
use crate::log_buffer::{LogBuffer, DEFAULT_LOG_CAPACITY};
use crate::observer::{ObserverSet, RunObserver};
use crate::projector::{RunProjector, RunSnapshot};
use crate::script::Script;
use breq_config::EngineConfig;
use breq_core::{LogEvent, RunMode, RunOutcome, RunState};
use breq_gateway::{DeviceDirectory, DeviceGateway};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Side channels into a run in progress
///
/// Stop is sticky: once requested it stays requested. Continue is one-shot
/// and only has an effect while the run is parked at a pause.
#[derive(Debug)]
pub struct RunSignals {
    stop: watch::Sender<bool>,
    pending_continue: Mutex<Option<oneshot::Sender<()>>>,
}

impl RunSignals {
    pub fn new() -> Self {
        let (stop, _rx) = watch::channel(false);
        Self {
            stop,
            pending_continue: Mutex::new(None),
        }
    }

    /// Request cancellation
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    /// Release a pending pause; returns `false` when nothing was paused
    pub fn continue_run(&self) -> bool {
        let sender = self
            .pending_continue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Whether the run is parked waiting for a continue
    pub fn is_pause_pending(&self) -> bool {
        self.pending_continue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn arm_pause(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        *self
            .pending_continue
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(tx);
        rx
    }

    pub(crate) fn disarm_pause(&self) {
        self.pending_continue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Resolves once stop has been requested, immediately if it already was
    pub(crate) async fn stopped(&self) {
        let mut rx = self.stop.subscribe();
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl Default for RunSignals {
    fn default() -> Self {
        Self::new()
    }
}

/// A run started by [`ScriptRunner::start`]
///
/// Dropping the handle does not stop the run.
pub struct RunHandle {
    task: JoinHandle<RunOutcome>,
    signals: Arc<RunSignals>,
}

impl RunHandle {
    pub fn stop(&self) {
        self.signals.stop();
    }

    pub fn continue_run(&self) -> bool {
        self.signals.continue_run()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end
    pub async fn outcome(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::Failed {
                reason: format!("run task failed: {}", e),
            },
        }
    }
}

/// Starts and controls script runs, one at a time
pub struct ScriptRunner {
    gateway: Arc<dyn DeviceGateway>,
    devices: Arc<dyn DeviceDirectory>,
    settings: ExecutorSettings,
    projector: Arc<RunProjector>,
    log: Arc<LogBuffer>,
    /// Always starts with the projector and the log buffer
    observers: ObserverSet,
    active: Arc<Mutex<Option<Arc<RunSignals>>>>,
}

impl ScriptRunner {
    pub fn new(gateway: Arc<dyn DeviceGateway>, devices: Arc<dyn DeviceDirectory>) -> Self {
        Self::with_log_capacity(gateway, devices, DEFAULT_LOG_CAPACITY)
    }

    /// Runner with timing and log size taken from `config`
    pub fn from_config(
        config: &EngineConfig,
        gateway: Arc<dyn DeviceGateway>,
        devices: Arc<dyn DeviceDirectory>,
    ) -> Self {
        Self::with_log_capacity(gateway, devices, config.log_buffer_size)
            .with_settings(ExecutorSettings::from(config))
    }

    fn with_log_capacity(
        gateway: Arc<dyn DeviceGateway>,
        devices: Arc<dyn DeviceDirectory>,
        log_capacity: usize,
    ) -> Self {
        let projector = Arc::new(RunProjector::new());
        let log = Arc::new(LogBuffer::new(log_capacity));
        Self {
            gateway,
            devices,
            settings: ExecutorSettings::default(),
            observers: ObserverSet::new()
                .with(projector.clone())
                .with(log.clone()),
            projector,
            log,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Add an observer; it sees every run started afterwards
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn projector(&self) -> &Arc<RunProjector> {
        &self.projector
    }

    /// Most recent log events across runs, oldest first
    pub fn log(&self) -> &Arc<LogBuffer> {
        &self.log
    }

    /// Start `script` on a new task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, script: Script, mode: RunMode) -> RunResult<RunHandle> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Err(RunError::RunAlreadyActive);
        }
        if !self.devices.has_any() {
            return Err(RunError::NoDeviceConnected);
        }

        let signals = Arc::new(RunSignals::new());
        *active = Some(signals.clone());
        drop(active);

        let observers = Arc::new(self.observers.clone());
        let executor = ScriptExecutor::new(self.gateway.clone(), observers.clone())
            .with_settings(self.settings);
        let devices = self.devices.clone();
        let slot = self.active.clone();
        let run_signals = signals.clone();

        debug!(script = script.name().unwrap_or("<unnamed>"), ?mode, "Spawning run");
        let task = tokio::spawn(async move {
            let result =
                AssertUnwindSafe(executor.run(&script, &*devices, mode, &run_signals))
                    .catch_unwind()
                    .await;

            let outcome = match result {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    warn!("Run did not start: {}", e);
                    RunOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
                Err(panic) => {
                    let reason = format!("run aborted: {}", panic_message(panic.as_ref()));
                    error!("{}", reason);
                    observers.log(&LogEvent::error(&reason));
                    observers.on_cursor_change(None);
                    observers.on_run_state_change(RunState::Failed);
                    RunOutcome::Failed { reason }
                }
            };

            release(&slot, &run_signals);
            outcome
        });

        Ok(RunHandle { task, signals })
    }

    /// Request cancellation of the active run; `false` when none is active
    pub fn stop(&self) -> bool {
        match self.active_signals() {
            Some(signals) => {
                info!("Stop requested");
                signals.stop();
                true
            }
            None => false,
        }
    }

    /// Release a single-block pause; `false` when no pause is pending
    pub fn continue_run(&self) -> bool {
        self.active_signals()
            .map(|signals| signals.continue_run())
            .unwrap_or(false)
    }

    /// Return a finished run to `Idle`
    pub fn reset(&self) -> RunResult<()> {
        let state = self.state();
        if self.active_signals().is_some() || state.is_active() {
            return Err(RunError::NotResettable { state });
        }

        if state.is_terminal() {
            self.observers.on_cursor_change(None);
            self.observers.on_run_state_change(RunState::Idle);
        }
        Ok(())
    }

    pub fn state(&self) -> RunState {
        self.projector.state()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.projector.cursor()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.projector.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunSnapshot> {
        self.projector.subscribe()
    }

    /// Whether a run has been started and not yet finished
    pub fn is_active(&self) -> bool {
        self.active_signals().is_some()
    }

    fn active_signals(&self) -> Option<Arc<RunSignals>> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Clear the active slot if it still belongs to `signals`
fn release(slot: &Mutex<Option<Arc<RunSignals>>>, signals: &Arc<RunSignals>) {
    let mut active = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if active.as_ref().is_some_and(|current| Arc::ptr_eq(current, signals)) {
        *active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breq_core::LogKind;
    use breq_gateway::{DeviceRegistry, SimulatedDevice};
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn runner() -> ScriptRunner {
        let registry = Arc::new(DeviceRegistry::new());
        SimulatedDevice::default().register(&registry, "alpha");
        ScriptRunner::new(registry.clone(), registry)
    }

    #[test]
    fn test_continue_without_pause_is_noop() {
        let signals = RunSignals::new();
        assert!(!signals.is_pause_pending());
        assert!(!signals.continue_run());
    }

    #[tokio::test]
    async fn test_continue_releases_armed_pause() {
        let signals = RunSignals::new();
        let rx = signals.arm_pause();
        assert!(signals.is_pause_pending());

        assert!(signals.continue_run());
        assert!(rx.await.is_ok());
        // One-shot: a second continue has nothing to release
        assert!(!signals.continue_run());
    }

    #[tokio::test]
    async fn test_stopped_resolves_after_stop() {
        let signals = RunSignals::new();
        signals.stop();
        signals.stopped().await;
        assert!(signals.is_stop_requested());
    }

    #[tokio::test]
    async fn test_start_requires_a_device() {
        let runner = ScriptRunner::new(
            Arc::new(DeviceRegistry::new()),
            Arc::new(BTreeSet::<String>::new()),
        );

        let result = runner.start(Script::parse("alpha.home"), RunMode::Continuous);
        assert!(matches!(result, Err(RunError::NoDeviceConnected)));
        assert_eq!(runner.state(), RunState::Idle);
        assert!(!runner.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_rejected_while_active() {
        let runner = runner();
        let handle = runner
            .start(Script::parse("wait 1\nalpha.home"), RunMode::Continuous)
            .unwrap();

        let second = runner.start(Script::parse("alpha.home"), RunMode::Continuous);
        assert!(matches!(second, Err(RunError::RunAlreadyActive)));

        assert_eq!(handle.outcome().await, RunOutcome::Completed);
        assert!(!runner.is_active());

        // Slot is free again once the first run has ended
        let third = runner
            .start(Script::parse("alpha.home"), RunMode::Continuous)
            .unwrap();
        assert_eq!(third.outcome().await, RunOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_buffer_capacity_from_config() {
        let registry = Arc::new(DeviceRegistry::new());
        SimulatedDevice::default().register(&registry, "alpha");
        let config = EngineConfig {
            log_buffer_size: 2,
            ..EngineConfig::default()
        };
        let runner = ScriptRunner::from_config(&config, registry.clone(), registry);
        assert_eq!(runner.log().capacity(), 2);

        let handle = runner
            .start(Script::parse("alpha.one\nalpha.two\n"), RunMode::Continuous)
            .unwrap();
        assert_eq!(handle.outcome().await, RunOutcome::Completed);

        // Only the newest two survive: the second reply and the completion notice
        let kinds: Vec<_> = runner.log().entries().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![LogKind::Success, LogKind::Success]);
        assert!(runner.log().entries()[0].message.contains("two"));
    }

    #[test]
    fn test_default_log_capacity() {
        assert_eq!(runner().log().capacity(), DEFAULT_LOG_CAPACITY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_after_completion() {
        let runner = runner();
        let handle = runner
            .start(Script::parse("alpha.home"), RunMode::Continuous)
            .unwrap();
        handle.outcome().await;
        assert_eq!(runner.state(), RunState::Completed);

        runner.reset().unwrap();
        assert_eq!(runner.state(), RunState::Idle);
        // Resetting an idle runner is harmless
        runner.reset().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_rejected_while_running() {
        let runner = runner();
        let handle = runner
            .start(Script::parse("wait 5\nalpha.home"), RunMode::Continuous)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(matches!(
            runner.reset(),
            Err(RunError::NotResettable {
                state: RunState::Running
            })
        ));

        assert!(runner.stop());
        assert_eq!(handle.outcome().await, RunOutcome::Stopped);
        assert!(!runner.stop());
    }
}
