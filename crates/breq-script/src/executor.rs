//! Script executor
//!
//! Runs one [`Script`] from top to bottom against a [`DeviceGateway`],
//! reporting progress to a [`RunObserver`]. The executor owns the run state
//! and cursor for the duration of the run; nothing else mutates them.
//!
//! Suspension points are the `wait` sleep, the settle delay after each
//! device command, the single-block pause and the gateway call itself.
//! A stop request is honored at every one of them except an in-flight
//! gateway call, which is awaited to completion or its timeout.

use crate::error::{RunError, RunResult};
use crate::instruction::{DeviceCommand, Instruction};
use crate::observer::RunObserver;
use crate::runner::RunSignals;
use crate::script::Script;
use breq_config::EngineConfig;
use breq_core::{Context, InvalidTransition, LogEvent, LogKind, RunMode, RunOutcome, RunState};
use breq_gateway::{DeviceDirectory, DeviceGateway};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Timing knobs for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Pause after every device command, giving the device time to act
    pub settle_delay: Duration,

    /// Upper bound on one gateway call; `None` waits forever
    pub command_timeout: Option<Duration>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            command_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl From<&EngineConfig> for ExecutorSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            settle_delay: config.settle_delay(),
            command_timeout: config.command_timeout(),
        }
    }
}

/// How a run left the line loop
#[derive(Debug)]
enum Termination {
    Completed,
    Stopped,
    Failed(String),
}

/// Whether to keep going after a suspension point
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Stop,
}

/// Run state and cursor, published to the observer on every change
struct RunTracker<'a> {
    observer: &'a dyn RunObserver,
    state: RunState,
    cursor: Option<usize>,
}

impl<'a> RunTracker<'a> {
    fn new(observer: &'a dyn RunObserver) -> Self {
        Self {
            observer,
            state: RunState::Idle,
            cursor: None,
        }
    }

    fn transition(&mut self, to: RunState) -> Result<(), InvalidTransition> {
        self.state = self.state.try_transition(to)?;
        self.observer.on_run_state_change(to);
        Ok(())
    }

    /// Bypass validation; only for recovering from an internal fault
    fn force(&mut self, to: RunState) {
        self.state = to;
        self.observer.on_run_state_change(to);
    }

    fn set_cursor(&mut self, cursor: Option<usize>) {
        if self.cursor != cursor {
            self.cursor = cursor;
            self.observer.on_cursor_change(cursor);
        }
    }

    fn log(&self, event: LogEvent) {
        self.observer.log(&event);
    }
}

/// Script executor
///
/// One executor can drive any number of runs, one after another or
/// concurrently; all per-run state lives in [`ScriptExecutor::run`].
pub struct ScriptExecutor {
    gateway: Arc<dyn DeviceGateway>,
    observer: Arc<dyn RunObserver>,
    settings: ExecutorSettings,
}

impl ScriptExecutor {
    pub fn new(gateway: Arc<dyn DeviceGateway>, observer: Arc<dyn RunObserver>) -> Self {
        Self {
            gateway,
            observer,
            settings: ExecutorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ExecutorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Run `script` to a terminal outcome
    ///
    /// Fails without touching any state when no device is connected. Every
    /// other problem ends the run with an outcome; the observer always sees
    /// a terminal state and a cleared cursor.
    pub async fn run(
        &self,
        script: &Script,
        devices: &dyn DeviceDirectory,
        mode: RunMode,
        signals: &RunSignals,
    ) -> RunResult<RunOutcome> {
        if !devices.has_any() {
            return Err(RunError::NoDeviceConnected);
        }

        let context = match script.name() {
            Some(name) => Context::for_script(name),
            None => Context::new(),
        };
        info!(
            run = %context.id,
            script = script.name().unwrap_or("<unnamed>"),
            ?mode,
            lines = script.len(),
            "Starting script run"
        );

        let mut run = RunTracker::new(self.observer.as_ref());
        self.observer.on_run_started(&context);

        let result = match run.transition(RunState::Running) {
            Ok(()) => {
                run.log(LogEvent::info(format!(
                    "Running {} ({} executable lines, {} mode)",
                    script.name().unwrap_or("script"),
                    script.executable_count(),
                    mode_label(mode),
                )));
                self.execute_lines(&mut run, script, devices, mode, signals)
                    .await
            }
            Err(e) => Err(e),
        };

        let outcome = match result.and_then(|termination| conclude(&mut run, termination)) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(run = %context.id, "Run aborted: {}", e);
                run.log(LogEvent::error(format!("Internal error: {}", e)));
                run.force(RunState::Failed);
                run.set_cursor(None);
                RunOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        info!(run = %context.id, outcome = ?outcome, "Script run finished");
        Ok(outcome)
    }

    async fn execute_lines(
        &self,
        run: &mut RunTracker<'_>,
        script: &Script,
        devices: &dyn DeviceDirectory,
        mode: RunMode,
        signals: &RunSignals,
    ) -> Result<Termination, InvalidTransition> {
        let last_executable = script.last_executable();

        for (index, instruction) in script.instructions() {
            if signals.is_stop_requested() {
                return Ok(Termination::Stopped);
            }
            if !instruction.is_executable() {
                continue;
            }

            run.set_cursor(Some(index));
            debug!(line = index, %instruction, "Executing line");

            let step = match instruction {
                Instruction::Wait { seconds } => {
                    let raw = script.line(index).unwrap_or_default();
                    self.execute_wait(run, index, seconds, raw, signals).await
                }
                Instruction::DeviceCommand(command) => {
                    if !devices.is_connected(&command.device) {
                        let reason = format!(
                            "Device '{}' is not connected (line {})",
                            command.device,
                            index + 1
                        );
                        run.log(
                            LogEvent::error(&reason)
                                .with_device(&command.device)
                                .at_line(index),
                        );
                        return Ok(Termination::Failed(reason));
                    }
                    self.execute_command(run, index, &command, signals).await
                }
                Instruction::Unrecognized { raw, reason } => {
                    warn!(line = index, %reason, "Unrecognized line");
                    run.log(
                        LogEvent::warning(format!(
                            "Skipping line {} '{}': {}",
                            index + 1,
                            raw,
                            reason
                        ))
                        .at_line(index),
                    );
                    Step::Continue
                }
                Instruction::Blank | Instruction::Comment => Step::Continue,
            };

            if step == Step::Stop {
                return Ok(Termination::Stopped);
            }

            if mode == RunMode::SingleBlock && Some(index) != last_executable {
                let step = self.pause(run, index, signals).await?;
                if step == Step::Stop {
                    return Ok(Termination::Stopped);
                }
            }
        }

        Ok(Termination::Completed)
    }

    async fn execute_wait(
        &self,
        run: &RunTracker<'_>,
        index: usize,
        seconds: Option<f64>,
        raw: &str,
        signals: &RunSignals,
    ) -> Step {
        let duration = seconds.and_then(|s| Duration::try_from_secs_f64(s).ok());
        match duration {
            Some(duration) => sleep_unless_stopped(duration, signals).await,
            None => {
                warn!(line = index, "Malformed wait duration");
                run.log(
                    LogEvent::warning(format!(
                        "Malformed wait duration on line {} '{}', not waiting",
                        index + 1,
                        raw.trim()
                    ))
                    .at_line(index),
                );
                Step::Continue
            }
        }
    }

    async fn execute_command(
        &self,
        run: &RunTracker<'_>,
        index: usize,
        command: &DeviceCommand,
        signals: &RunSignals,
    ) -> Step {
        let payload = command.payload();
        run.log(
            LogEvent::new(LogKind::Sent, &payload)
                .with_device(&command.device)
                .at_line(index),
        );

        match self.dispatch(&command.device, &payload).await {
            Ok(()) => run.log(
                LogEvent::new(LogKind::Success, format!("acknowledged '{}'", payload))
                    .with_device(&command.device)
                    .at_line(index),
            ),
            Err(reason) => {
                warn!(device = %command.device, line = index, "Command rejected: {}", reason);
                run.log(
                    LogEvent::error(format!("Command '{}' failed: {}", payload, reason))
                        .with_device(&command.device)
                        .at_line(index),
                );
            }
        }

        sleep_unless_stopped(self.settings.settle_delay, signals).await
    }

    /// Send one command and reduce every failure mode to a message
    #[instrument(level = "debug", skip(self))]
    async fn dispatch(&self, device: &str, payload: &str) -> Result<(), String> {
        let call = AssertUnwindSafe(self.gateway.send(device, payload)).catch_unwind();

        let result = match self.settings.command_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Err(format!("no reply within {} ms", limit.as_millis())),
            },
            None => call.await,
        };

        match result {
            Ok(Ok(reply)) if reply.success => Ok(()),
            Ok(Ok(reply)) => Err(reply
                .error
                .unwrap_or_else(|| "device reported failure".to_string())),
            Ok(Err(e)) => Err(e.to_string()),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(device, "Gateway panicked: {}", message);
                Err(format!("gateway panicked: {}", message))
            }
        }
    }

    /// Single-block pause after line `index`
    async fn pause(
        &self,
        run: &mut RunTracker<'_>,
        index: usize,
        signals: &RunSignals,
    ) -> Result<Step, InvalidTransition> {
        if signals.is_stop_requested() {
            return Ok(Step::Stop);
        }

        // Armed before the state is published so a continue issued in
        // reaction to `Paused` always finds the slot
        let resume = signals.arm_pause();
        run.transition(RunState::Paused)?;
        run.log(
            LogEvent::new(
                LogKind::Pause,
                format!("Paused after line {}, continue to execute the next line", index + 1),
            )
            .at_line(index),
        );

        let step = tokio::select! {
            biased;
            _ = signals.stopped() => Step::Stop,
            // A dropped sender only happens if the slot was replaced; treat it as continue
            _ = resume => Step::Continue,
        };
        signals.disarm_pause();

        if step == Step::Continue {
            debug!(line = index, "Continuing");
            run.transition(RunState::Running)?;
        }
        Ok(step)
    }
}

/// Move the run into its terminal state
fn conclude(
    run: &mut RunTracker<'_>,
    termination: Termination,
) -> Result<RunOutcome, InvalidTransition> {
    let outcome = match termination {
        Termination::Completed => {
            run.transition(RunState::Completed)?;
            run.log(LogEvent::new(LogKind::Success, "Script completed"));
            RunOutcome::Completed
        }
        Termination::Stopped => {
            run.transition(RunState::Stopping)?;
            run.transition(RunState::Stopped)?;
            run.log(LogEvent::new(LogKind::Stop, "Script stopped by operator"));
            RunOutcome::Stopped
        }
        Termination::Failed(reason) => {
            run.transition(RunState::Failed)?;
            RunOutcome::Failed { reason }
        }
    };

    run.set_cursor(None);
    Ok(outcome)
}

async fn sleep_unless_stopped(duration: Duration, signals: &RunSignals) -> Step {
    if duration.is_zero() {
        return if signals.is_stop_requested() {
            Step::Stop
        } else {
            Step::Continue
        };
    }

    tokio::select! {
        biased;
        _ = signals.stopped() => Step::Stop,
        _ = tokio::time::sleep(duration) => Step::Continue,
    }
}

fn mode_label(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Continuous => "continuous",
        RunMode::SingleBlock => "single-block",
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
