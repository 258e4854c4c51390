//! Pi Collide entry point
//!
//! Runs the experiment headless, one simulated display frame per `step`,
//! and prints the final count and π estimate.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use pi_collide::consts::{FRAME_DT, MAX_POWER, MIN_POWER};
use pi_collide::sim::{CancelHandle, Engine, Observer, RunReport, SimEvent, Snapshot, parse_power};
use pi_collide::{Result, Settings, SimError};

#[derive(Parser)]
#[command(name = "pi-collide")]
#[command(about = "Count collisions between two blocks and a wall to compute digits of π", long_about = None)]
struct Cli {
    /// Mass ratio is 100^(power-1); prompts on stdin when omitted
    #[arg(short, long)]
    power: Option<u32>,

    /// JSON settings file, missing fields fall back to defaults
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Display frame time handed to each step
    #[arg(long, default_value_t = FRAME_DT)]
    frame_dt: f64,

    /// Cancel the run after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Skip quiet stretches up to this distance from the next contact
    #[arg(long)]
    coast: Option<f64>,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

/// Logs progress every tenth of the expected count
struct Progress {
    expected: u64,
    next_tenth: u64,
}

impl Progress {
    fn new() -> Self {
        Self {
            expected: 0,
            next_tenth: 1,
        }
    }
}

impl Observer for Progress {
    fn on_event(&mut self, event: &SimEvent) {
        if event.is_correction() {
            log::warn!("Correction during run: {event:?}");
        }
    }

    fn on_checkpoint(&mut self, snapshot: &Snapshot) {
        let Some(expected) = snapshot.expected_collisions else {
            return;
        };
        self.expected = expected;
        if expected < 10 || self.next_tenth > 9 {
            return;
        }
        if snapshot.collision_count * 10 >= expected * self.next_tenth {
            log::info!(
                "{}0% - {} / {} collisions, t = {:.3}s",
                self.next_tenth,
                snapshot.collision_count,
                self.expected,
                snapshot.time
            );
            self.next_tenth = snapshot.collision_count * 10 / expected + 1;
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if cli.coast.is_some() {
        settings.coast_gap = cli.coast;
    }

    let mut engine = Engine::new(settings)?;
    match cli.power {
        Some(power) => engine.configure(power)?,
        None => engine.configure(prompt_power()?)?,
    }
    engine.set_observer(Box::new(Progress::new()));

    log::info!("Pi Collide starting...");
    let report = run_frames(&mut engine, cli.frame_dt, cli.max_frames)?;
    print_report(&report, cli.json)
}

/// Step until the engine stops, cancelling after `max_frames`
fn run_frames(engine: &mut Engine, frame_dt: f64, max_frames: Option<u64>) -> Result<RunReport> {
    if !frame_dt.is_finite() || frame_dt <= 0.0 {
        return Err(SimError::InvalidConfiguration(format!(
            "frame dt must be finite and > 0, got {frame_dt}"
        )));
    }

    let cancel: CancelHandle = engine.cancel_handle();
    let mut frames = 0u64;
    loop {
        if max_frames.is_some_and(|max| frames >= max) {
            log::info!("Frame limit {frames} reached, cancelling");
            cancel.cancel();
        }
        let outcome = engine.step(frame_dt);
        frames += 1;
        if outcome.is_terminal() {
            break;
        }
    }

    engine
        .report()
        .ok_or_else(|| SimError::InvalidConfiguration("run stopped without a report".into()))
}

/// Ask for a power until a valid one is typed
fn prompt_power() -> Result<u32> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("Power [{MIN_POWER}-{MAX_POWER}]: ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Err(SimError::InvalidConfiguration(
                "no power given on stdin".into(),
            ));
        };
        match parse_power(&line?) {
            Ok(power) => return Ok(power),
            Err(e) => eprintln!("{e}"),
        }
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let status = if report.complete { "complete" } else { "cancelled" };
    println!("Power {} (mass ratio {:e}), {}", report.power, report.mass_ratio, status);
    println!(
        "Collisions: {} (expected {})",
        report.collision_count, report.expected_collisions
    );
    println!(
        "π ≈ {:.9} (error {:.3e})",
        report.pi_estimate, report.absolute_error
    );
    println!(
        "{} substeps over {} frames, {:.3}s simulated",
        report.substeps, report.outer_steps, report.physical_time
    );
    Ok(())
}
