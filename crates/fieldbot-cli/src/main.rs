//! `fieldbot-cli` – Fieldbot command line runner
//!
//! This binary runs one scripted match against the robot:
//!
//! 1. Loads `fieldbot.toml` (or the file given with `--config <path>`) and
//!    applies the `FIELDBOT_*` environment overrides.
//! 2. Builds the robot for the configured operating mode, with the scripted
//!    input device when `input_script` is set.
//! 3. Drives the fixed-period control cycle through the disabled,
//!    autonomous and teleop phases.
//! 4. Intercepts **Ctrl-C** to disable the robot and exit cleanly.
//!
//! Any startup failure is printed and the process exits with status 1.

mod config;
mod input;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use fieldbot_hal::bench::BenchRegistry;
use fieldbot_runtime::profile::NoDevice;
use fieldbot_runtime::{
    HardwareSelector, InputDevice, JsonLinesSink, NullSink, Robot, RobotState, TelemetrySink,
    init_tracing,
};
use fieldbot_types::{ConfigError, FieldbotError, OperatingMode};

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::input::ScriptedDevice;

fn main() -> ExitCode {
    // ── Structured logging ────────────────────────────────────────────────
    // Installed before the runtime exists; the OTLP exporter is synchronous.
    let _tracing = init_tracing("fieldbot");

    print_banner();

    let config_path = match config_path_from_args(std::env::args().skip(1)) {
        Ok(path) => path,
        Err(e) => return fail(&FieldbotError::from(e)),
    };
    let cfg = match config::load_from(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => return fail(&FieldbotError::from(e)),
    };
    println!("  Config: {}", config_path.display().to_string().bold());

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – disabling robot …".yellow().bold());
        shutdown_flag.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; the match can only end on its own");
    }

    // ── Control loop ──────────────────────────────────────────────────────
    // Single-threaded: the robot holds `Rc` handles into the simulated world.
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to start the async runtime");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run_match(&cfg, &shutdown)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Match
// ─────────────────────────────────────────────────────────────────────────────

async fn run_match(cfg: &Config, shutdown: &AtomicBool) -> Result<(), FieldbotError> {
    let mut device = open_device(cfg)?;
    let sink = open_sink(cfg)?;
    let selector = build_selector(cfg)?;

    let mut robot = Robot::new(
        &cfg.robot_config(),
        cfg.mode,
        selector,
        device.identity().as_ref(),
        sink,
    )?;

    println!("  Mode:       {}", cfg.mode.to_string().bold());
    println!("  Controller: {}", robot.profile().kind.to_string().bold());
    println!(
        "  Autonomous: {} ({} choices)",
        robot.catalog().selected_name().bold(),
        robot.catalog().len()
    );
    println!();

    let period = cfg.loop_period();
    let dt = period.as_secs_f64();
    let phases = [
        (RobotState::Disabled, cfg.phases.disabled_s),
        (RobotState::Autonomous, cfg.phases.autonomous_s),
        (RobotState::Teleop, cfg.phases.teleop_s),
    ];
    let match_length: f64 = phases.iter().map(|(_, s)| s).sum();

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut cycles: u64 = 0;
    loop {
        ticker.tick().await;
        if shutdown.load(Ordering::SeqCst) {
            info!(cycles, "shutdown requested");
            break;
        }
        // Script time advances one period per cycle, independent of jitter.
        let elapsed = cycles as f64 * dt;
        let Some(state) = phase_at(&phases, elapsed) else {
            break;
        };
        if state != robot.state() {
            println!("  {} {}", "▶".cyan(), state.to_string().bold());
        }
        robot.set_state(state);
        robot.cycle(device.poll(elapsed), dt)?;
        cycles += 1;
    }
    robot.set_state(RobotState::Disabled);

    let pose = robot.context().drive.pose();
    println!();
    println!(
        "  {} {} cycles ({:.1} of {:.1} s), {} overruns",
        "✓".green().bold(),
        cycles,
        cycles as f64 * dt,
        match_length,
        robot.overrun_count()
    );
    println!(
        "  Final pose: ({:.2}, {:.2}) @ {:.1}°",
        pose.x(),
        pose.y(),
        pose.rotation.degrees()
    );
    Ok(())
}

/// State for script time `elapsed`, or `None` once the match is over.
fn phase_at(phases: &[(RobotState, f64)], elapsed: f64) -> Option<RobotState> {
    let mut end = 0.0;
    for (state, length) in phases {
        end += length;
        if elapsed < end {
            return Some(*state);
        }
    }
    None
}

fn build_selector(cfg: &Config) -> Result<HardwareSelector, FieldbotError> {
    let selector = HardwareSelector::new().with_ports(cfg.ports.clone());
    if cfg.mode != OperatingMode::Real {
        return Ok(selector);
    }
    // No vendor drivers are linked into this binary.
    let ports = cfg.ports.resolve()?;
    warn!("real mode is running against bench devices");
    Ok(selector.with_devices(BenchRegistry::for_ports(&ports).build()))
}

fn open_device(cfg: &Config) -> Result<Box<dyn InputDevice>, FieldbotError> {
    match &cfg.input_script {
        Some(path) => {
            info!(script = %path.display(), "using scripted input");
            Ok(Box::new(ScriptedDevice::load(path)?))
        }
        None => Ok(Box::new(NoDevice)),
    }
}

fn open_sink(cfg: &Config) -> Result<Box<dyn TelemetrySink>, FieldbotError> {
    let Some(path) = &cfg.telemetry_out else {
        return Ok(Box::new(NullSink));
    };
    let file = File::create(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;
    info!(path = %path.display(), "recording telemetry");
    Ok(Box::new(JsonLinesSink::new(BufWriter::new(file))))
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn config_path_from_args(mut args: impl Iterator<Item = String>) -> Result<PathBuf, ConfigError> {
    let mut path = PathBuf::from(DEFAULT_CONFIG_FILE);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => match args.next() {
                Some(value) => path = PathBuf::from(value),
                None => return Err(ConfigError::Invalid("--config needs a path".into())),
            },
            other => return Err(ConfigError::Invalid(format!("unexpected argument '{other}'"))),
        }
    }
    Ok(path)
}

fn fail(e: &FieldbotError) -> ExitCode {
    error!(error = %e, "fieldbot stopped");
    println!("{}: {}", "Error".red().bold(), e);
    ExitCode::FAILURE
}

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "Fieldbot".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Robot control core: real, simulated and replay");
    println!();
}
