//! breq command-line runner
//!
//! Loads a script and the engine configuration, registers simulated
//! devices and runs the script with operator output on stdout. Ctrl-C
//! stops the run; in single-block mode Enter releases each pause.

mod check;
mod cli;
mod devices;
mod terminal;

use anyhow::{Context, Result};
use breq_config::EngineConfig;
use breq_core::{LogKind, RunMode, RunOutcome};
use breq_script::{Script, ScriptRunner, TracingObserver};
use clap::Parser;
use std::path::Path;
use std::pin::pin;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use terminal::TerminalObserver;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = match cli.debug {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            script,
            config,
            single_block,
            devices,
        } => run(&script, &config, single_block, &devices, cli.debug > 0).await,
        Commands::Check { script } => check(&script),
    }
}

async fn run(
    script_path: &Path,
    config_path: &Path,
    single_block: bool,
    extra_devices: &[String],
    trace_log: bool,
) -> Result<ExitCode> {
    let config = EngineConfig::load_or_default(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let script = Script::load(script_path)?;
    let registry = Arc::new(devices::build_registry(&config, extra_devices)?);

    let mode = if single_block {
        RunMode::SingleBlock
    } else {
        config.mode
    };
    info!(?mode, devices = registry.device_count(), "Configuration loaded");

    let mut runner = ScriptRunner::from_config(&config, registry.clone(), registry)
        .with_observer(Arc::new(TerminalObserver::new(script.clone())));
    if trace_log {
        runner = runner.with_observer(Arc::new(TracingObserver));
    }

    let handle = runner.start(script, mode)?;
    let mut finished = pin!(handle.outcome());
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = mode == RunMode::SingleBlock;

    let outcome = loop {
        tokio::select! {
            outcome = &mut finished => break outcome,
            _ = tokio::signal::ctrl_c() => {
                runner.stop();
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    if !runner.continue_run() {
                        debug!("Nothing to continue");
                    }
                }
                // Closed stdin leaves Ctrl-C as the only control
                Ok(None) | Err(_) => stdin_open = false,
            },
        }
    };

    let entries = runner.log().entries();
    let count = |kind: LogKind| entries.iter().filter(|e| e.kind == kind).count();
    let (warnings, errors) = (count(LogKind::Warning), count(LogKind::Error));
    if warnings + errors > 0 {
        eprintln!("{} warning(s), {} error(s) in the last {} log entries", warnings, errors, entries.len());
    }

    Ok(match outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Stopped => ExitCode::from(130),
        RunOutcome::Failed { reason } => {
            eprintln!("Run failed: {}", reason);
            ExitCode::FAILURE
        }
    })
}

fn check(script_path: &Path) -> Result<ExitCode> {
    let script = Script::load(script_path)?;
    let report = check::check(&script);

    for line in &report.lines {
        println!("{}", line);
    }
    println!(
        "{} lines, {} executable, {} with problems",
        script.len(),
        report.executable,
        report.problems
    );

    Ok(if report.problems == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
