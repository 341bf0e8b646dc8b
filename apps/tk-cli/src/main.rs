use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tk_app::{AppResult, Command, PlantParams, Simulation, StatusSnapshot, execute};
use tk_config::{ControllerSettings, JsonFileStore, load_yaml};
use tk_core::timing::{after, deadline_reached, elapsed, remaining};
use tk_core::{Clock, Millis, MonotonicClock, Real};
use tk_sensor::ProbeFault;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Control cycle length of the simulated main loop.
const TICK_MS: Millis = 50;

/// Interval between status lines, in simulated time.
const REPORT_MS: Millis = 1000;

#[derive(Parser)]
#[command(name = "tk-cli")]
#[command(
    about = "Tank heater controller - host simulation and settings tool",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the controller against a simulated probe and tank
    Simulate {
        /// Startup settings YAML file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Simulated duration in seconds
        #[arg(long, default_value_t = 600)]
        seconds: u32,
        /// Persistent settings JSON file, applied on top of the config
        #[arg(long)]
        store: Option<PathBuf>,
        /// Corrupt one probe read every N simulated seconds
        #[arg(long)]
        fault_every: Option<u32>,
        /// Initial tank temperature in °C
        #[arg(long, default_value_t = 20.0)]
        initial: Real,
        /// Print JSON lines instead of text
        #[arg(long)]
        json: bool,
        /// Pace the loop against the wall clock instead of running flat out
        #[arg(long)]
        realtime: bool,
    },
    /// Load, sanitize and print a settings YAML file
    CheckConfig {
        /// Path to the settings YAML file
        path: PathBuf,
    },
    /// Run `HEAT ...` commands, in order, against the stored settings
    Exec {
        /// Persistent settings JSON file
        #[arg(long)]
        store: PathBuf,
        /// Command lines, e.g. "HEAT SET 48" "HEAT SAVE"
        #[arg(required = true)]
        lines: Vec<String>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            seconds,
            store,
            fault_every,
            initial,
            json,
            realtime,
        } => cmd_simulate(
            config.as_deref(),
            seconds,
            store,
            fault_every,
            initial,
            json,
            realtime,
        ),
        Commands::CheckConfig { path } => cmd_check_config(&path),
        Commands::Exec { store, lines } => cmd_exec(store, &lines),
    }
}

#[derive(Serialize)]
struct SimLine<'a> {
    time_s: u32,
    tank_c: Real,
    status: &'a StatusSnapshot,
}

/// Paces the simulated loop at `TICK_MS` of wall-clock time.
struct Pacer {
    wall: MonotonicClock,
    next_tick: Millis,
    last: Millis,
}

impl Pacer {
    fn new() -> Self {
        let wall = MonotonicClock::new();
        let now = wall.now_ms();
        Self {
            wall,
            next_tick: after(now, TICK_MS),
            last: now,
        }
    }

    /// Sleep until the next tick is due; returns the wall time since the
    /// previous tick.
    fn wait(&mut self) -> Millis {
        let pause = remaining(self.wall.now_ms(), self.next_tick);
        std::thread::sleep(Duration::from_millis(u64::from(pause)));
        self.next_tick = after(self.next_tick, TICK_MS);
        let now = self.wall.now_ms();
        let dt = elapsed(now, self.last);
        self.last = now;
        dt
    }
}

fn cmd_simulate(
    config: Option<&Path>,
    seconds: u32,
    store: Option<PathBuf>,
    fault_every: Option<u32>,
    initial: Real,
    json: bool,
    realtime: bool,
) -> AppResult<()> {
    let settings = match config {
        Some(path) => load_yaml(path)?,
        None => ControllerSettings::default(),
    };
    let mut sim = Simulation::new(&settings, PlantParams::default(), initial)?;

    if let Some(path) = store.or_else(|| settings.store_path.clone()) {
        let store = JsonFileStore::new(path)?;
        sim.controller_mut().load(&store)?;
    }

    info!(seconds, initial, realtime, "simulation started");
    let mut pacer = realtime.then(Pacer::new);
    let mut next_report_ms = REPORT_MS;
    let end_ms = seconds.saturating_mul(1000);
    while sim.now_ms() < end_ms {
        let dt = pacer.as_mut().map_or(TICK_MS, Pacer::wait);
        if let Err(e) = sim.step(dt) {
            warn!(error = %e, "control cycle failed");
        }
        let now = sim.now_ms();
        if !deadline_reached(now, next_report_ms) {
            continue;
        }
        let second = next_report_ms / 1000;
        next_report_ms = after(next_report_ms, REPORT_MS);
        if let Some(every) = fault_every.filter(|n| *n > 0) {
            if second % every == 0 {
                sim.inject(ProbeFault::Corrupt);
            }
        }

        let status = sim.controller().status(now);
        let tank_c = sim.tank().temperature_c();
        if json {
            let line = SimLine {
                time_s: second,
                tank_c,
                status: &status,
            };
            match serde_json::to_string(&line) {
                Ok(text) => println!("{text}"),
                Err(e) => warn!(error = %e, "cannot encode status line"),
            }
        } else {
            println!("{second:>6}s  tank={tank_c:6.2}C  {status}");
        }
    }

    let stats = sim.controller().acquisition().stats();
    println!(
        "✓ Simulated {}s: {} good reads, {} faults",
        seconds,
        stats.ok,
        stats.faults()
    );
    Ok(())
}

fn cmd_check_config(path: &Path) -> AppResult<()> {
    println!("Checking settings: {}", path.display());
    let settings = load_yaml(path)?;
    match serde_yaml::to_string(&settings) {
        Ok(text) => print!("{text}"),
        Err(e) => warn!(error = %e, "cannot print settings"),
    }
    println!("✓ Settings are valid");
    Ok(())
}

fn cmd_exec(store_path: PathBuf, lines: &[String]) -> AppResult<()> {
    let commands = lines
        .iter()
        .map(|line| Command::parse(line))
        .collect::<Result<Vec<_>, _>>()?;

    let mut store = JsonFileStore::new(store_path)?;
    let settings = ControllerSettings::default();
    let mut sim = Simulation::new(&settings, PlantParams::default(), 20.0)?;
    let controller = sim.controller_mut();
    controller.load(&store)?;

    let mut unsaved = false;
    for command in commands {
        println!("{}", execute(controller, command, &mut store, 0)?);
        if command.mutates() {
            unsaved = true;
        } else if command == Command::Save || command == Command::Load {
            unsaved = false;
        }
    }
    if unsaved {
        warn!(
            "settings changed but not saved; add \"HEAT SAVE\" to keep them"
        );
    }
    Ok(())
}
