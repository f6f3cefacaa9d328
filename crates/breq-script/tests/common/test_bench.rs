//! Test bench
//!
//! An isolated runner with a recording gateway, a recording observer and a
//! device registry whose connectivity tests can flip mid-run.

use super::{RecordingGateway, RecordingObserver};
use breq_core::{RunMode, RunOutcome};
use breq_gateway::{ConnectionMethod, CommandReply, DeviceRegistry};
use breq_script::{ExecutorSettings, RunHandle, Script, ScriptRunner};
use std::sync::Arc;
use std::time::Duration;

pub struct TestBench {
    pub gateway: Arc<RecordingGateway>,
    pub observer: Arc<RecordingObserver>,
    /// Connectivity only; commands go to `gateway`
    pub devices: Arc<DeviceRegistry>,
    pub runner: ScriptRunner,
}

impl TestBench {
    /// Bench with the given devices connected and the default 100 ms settle delay
    pub fn new(devices: &[&str]) -> Self {
        Self::with_gateway(devices, RecordingGateway::new())
    }

    pub fn with_gateway(devices: &[&str], gateway: RecordingGateway) -> Self {
        let gateway = Arc::new(gateway);
        let observer = Arc::new(RecordingObserver::new());
        let registry = Arc::new(DeviceRegistry::new());
        for device in devices {
            registry.register(*device, ConnectionMethod::Simulated, |_| async {
                Ok(CommandReply::ok())
            });
        }

        let runner = ScriptRunner::new(gateway.clone(), registry.clone())
            .with_settings(ExecutorSettings {
                settle_delay: Duration::from_millis(100),
                command_timeout: Some(Duration::from_secs(10)),
            })
            .with_observer(observer.clone());

        Self {
            gateway,
            observer,
            devices: registry,
            runner,
        }
    }

    pub fn start(&self, text: &str, mode: RunMode) -> RunHandle {
        self.runner
            .start(Script::parse(text), mode)
            .expect("run should start")
    }

    /// Run to completion in continuous mode
    pub async fn run(&self, text: &str) -> RunOutcome {
        self.start(text, RunMode::Continuous).outcome().await
    }
}
