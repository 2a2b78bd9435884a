//! Brew regulator: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  SimEnclosure      GpioRelay × 2     JsonStore               │
//! │  (Sensor + pins)   (RelayPort)       (GoalSource, state)     │
//! │  LogEventSink      HealthSink                                │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        Regulator (poller thread + regulation loop)     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use brewregulator::adapters::gpio_relay::GpioRelay;
use brewregulator::adapters::health::HealthMonitor;
use brewregulator::adapters::log_sink::LogEventSink;
use brewregulator::adapters::simulated::{SimEnclosure, ThermalModel};
use brewregulator::adapters::store::JsonStore;
use brewregulator::app::ports::{GoalSource, RelayPort};
use brewregulator::app::shutdown::ShutdownSignal;
use brewregulator::interlock::RelayPair;
use brewregulator::{Goal, Purpose, Regulator, RegulatorConfig};

/// Relay boards on the chamber switch on a low input.
const ACTIVE_LOW: bool = true;

const DEFAULT_DRIFT_C: f32 = 0.5;

/// Upper bound for `--time-scale`; a year of simulated time per second.
const MAX_TIME_SCALE: f32 = 31_536_000.0;

#[derive(Parser, Debug)]
#[command(name = "brewregulator")]
#[command(version, about = "Hold a fermentation chamber at a target temperature", long_about = None)]
struct Cli {
    /// Target temperature in °C. Stored and reused on later runs.
    target: Option<f32>,

    /// Allowed drift from target in °C.
    drift: Option<f32>,

    /// Pause between regulation cycles in seconds (overrides config).
    #[arg(short, long)]
    interval: Option<f32>,

    /// JSON config file with timing constants.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State file holding the goal and relay states.
    #[arg(short, long, default_value = "brewregulator.json")]
    state: PathBuf,

    /// Simulated ambient temperature in °C.
    #[arg(long, default_value_t = 22.0)]
    ambient: f32,

    /// Simulated chamber temperature at startup in °C.
    #[arg(long, default_value_t = 22.0)]
    start_temp: f32,

    /// Simulated seconds per real second.
    #[arg(long, default_value_t = 1.0, value_parser = parse_time_scale)]
    time_scale: f32,

    /// Write log records to this file instead of the console.
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence).
    #[arg(short, long)]
    debug: bool,
}

fn parse_time_scale(s: &str) -> Result<f32, String> {
    let scale: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if scale.is_nan() || scale <= 0.0 || scale > MAX_TIME_SCALE {
        return Err(format!("must be > 0 and <= {MAX_TIME_SCALE}"));
    }
    Ok(scale)
}

fn init_logging(debug: bool, logfile: Option<&Path>) -> Result<()> {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    match logfile {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).with_ansi(false).init();
        }
        None => builder.init(),
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<RegulatorConfig> {
    let mut config = match &cli.config {
        Some(path) => RegulatorConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => RegulatorConfig::default(),
    };
    if let Some(secs) = cli.interval {
        config.cycle_interval_secs = secs;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Forward SIGINT / SIGTERM to `shutdown`.
///
/// Handlers are registered before returning, so a signal that arrives while
/// relays are being resumed is not lost.
#[cfg(unix)]
fn spawn_signal_listener(shutdown: Arc<ShutdownSignal>) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("failed to build signal runtime")?;
    let (mut sigterm, mut sigint) = {
        let _ctx = runtime.enter();
        (
            signal(SignalKind::terminate()).context("failed to register SIGTERM")?,
            signal(SignalKind::interrupt()).context("failed to register SIGINT")?,
        )
    };

    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            runtime.block_on(async {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
            });
            shutdown.request();
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

#[cfg(not(unix))]
fn spawn_signal_listener(shutdown: Arc<ShutdownSignal>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .context("failed to build signal runtime")?;
    std::thread::Builder::new()
        .name("signals".into())
        .spawn(move || {
            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    info!("Received Ctrl-C");
                    shutdown.request();
                }
                Err(e) => warn!("Ctrl-C listener failed: {}", e),
            }
        })
        .context("failed to spawn signal thread")?;
    Ok(())
}

/// Persist a goal given on the command line, then read back whatever is
/// stored. No goal anywhere is a startup error.
fn resolve_goal(cli: &Cli, store: &JsonStore) -> Result<Goal> {
    match (cli.target, cli.drift) {
        (Some(target), drift) => {
            let goal = Goal::new(target, drift.unwrap_or(DEFAULT_DRIFT_C));
            store.set_goal(goal).context("invalid goal")?;
        }
        (None, Some(_)) => bail!("a drift was given without a target"),
        (None, None) => {}
    }
    store
        .goal()
        .context("no goal stored; pass TARGET [DRIFT] to set one")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug, cli.logfile.as_deref())?;

    info!("Brew regulator v{}", env!("CARGO_PKG_VERSION"));

    let shutdown = Arc::new(ShutdownSignal::new());
    spawn_signal_listener(Arc::clone(&shutdown))?;

    let config = load_config(&cli)?;
    let store = Arc::new(
        JsonStore::open(&cli.state)
            .with_context(|| format!("failed to open state file {}", cli.state.display()))?,
    );
    let goal = resolve_goal(&cli, &store)?;
    info!(
        "Goal {:.2}\u{00b0}C \u{00b1}{:.2}, state in {}",
        goal.target_c,
        goal.drift_c,
        cli.state.display()
    );

    let sim = SimEnclosure::new(
        cli.start_temp,
        ThermalModel {
            ambient_c: cli.ambient,
            time_scale: cli.time_scale,
            ..ThermalModel::default()
        },
    );

    let mut heating = GpioRelay::resume(
        sim.pin(Purpose::Heating, ACTIVE_LOW),
        Purpose::Heating,
        Arc::clone(&store),
        ACTIVE_LOW,
    )
    .context("failed to resume heating relay")?;
    let cooling = match GpioRelay::resume(
        sim.pin(Purpose::Cooling, ACTIVE_LOW),
        Purpose::Cooling,
        Arc::clone(&store),
        ACTIVE_LOW,
    ) {
        Ok(r) => r,
        Err(e) => {
            if let Err(off) = heating.set(false) {
                warn!("Could not turn heating relay off: {}", off);
            }
            return Err(e).context("failed to resume cooling relay");
        }
    };

    // On a validation failure the regulator turns both relays off itself.
    let health = HealthMonitor::new();
    let regulator = Regulator::new(
        config,
        sim.sensor(),
        RelayPair::new(heating, cooling),
        Arc::clone(&store),
        (LogEventSink::new(), health.sink()),
    )?
    .with_shutdown(shutdown);

    let result = regulator.start();

    info!(
        "{} events, last transitions: {:?}",
        health.event_count(),
        health.recent_transitions()
    );
    result.context("regulation stopped by a fault")
}
