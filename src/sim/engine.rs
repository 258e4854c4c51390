//! Simulation engine
//!
//! Owns the two blocks, the wall and the counters. Callers configure a
//! power, then call `step` once per display frame until it reports
//! `Complete` or `Cancelled`, reading `snapshot` in between.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::collision::Resolution;
use super::event::{Observer, SimEvent};
use super::metrics::{self, RunReport};
use super::state::{SimState, Snapshot, StepMode, StepOutcome};
use super::stepper::{self, StepSink};
use crate::consts::{MAX_POWER, MIN_POWER};
use crate::error::{Result, SimError};
use crate::mass_for_power;
use crate::settings::Settings;

/// Shared cancellation flag
///
/// Cloneable so an observer or another thread can stop a running burst.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Parse a power typed by a user. Rejects anything that is not an integer
/// in [1, 9].
pub fn parse_power(input: &str) -> Result<u32> {
    let trimmed = input.trim();
    let power: i64 = trimmed
        .parse()
        .map_err(|_| SimError::invalid(format!("power must be an integer, got {trimmed:?}")))?;
    validate_power(power)
}

fn validate_power(power: i64) -> Result<u32> {
    if (i64::from(MIN_POWER)..=i64::from(MAX_POWER)).contains(&power) {
        Ok(power as u32)
    } else {
        Err(SimError::invalid(format!(
            "power must be in [{MIN_POWER}, {MAX_POWER}], got {power}"
        )))
    }
}

/// The collision experiment
pub struct Engine {
    settings: Settings,
    state: SimState,
    /// None until configured
    power: Option<u32>,
    outcome: StepOutcome,
    mode: StepMode,
    /// `step` calls that did work
    outer_steps: u64,
    cancel: CancelHandle,
    observer: Option<Box<dyn Observer>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("power", &self.power)
            .field("outcome", &self.outcome)
            .field("mode", &self.mode)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Unconfigured engine; blocks sit at their start positions at rest
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let mut state = SimState::new(&settings, 1.0);
        state.right.velocity = 0.0;
        let mode = StepMode::Normal {
            substeps: settings.base_substeps,
        };
        Ok(Self {
            settings,
            state,
            power: None,
            outcome: StepOutcome::Running,
            mode,
            outer_steps: 0,
            cancel: CancelHandle::default(),
            observer: None,
        })
    }

    /// Default settings, configured for `power`
    pub fn with_power(power: u32) -> Result<Self> {
        let mut engine = Self::new(Settings::default())?;
        engine.configure(power)?;
        Ok(engine)
    }

    /// Start a fresh run with mass ratio 100^(power-1).
    ///
    /// Clears any cancellation requested before the call; it applied to the
    /// previous run.
    pub fn configure(&mut self, power: u32) -> Result<()> {
        let power = validate_power(i64::from(power))?;
        let right_mass = mass_for_power(power);

        self.state = SimState::new(&self.settings, right_mass);
        self.power = Some(power);
        self.outcome = StepOutcome::Running;
        self.mode = StepMode::Normal {
            substeps: self.settings.frame_substeps(self.state.mass_ratio()),
        };
        self.outer_steps = 0;
        if self.cancel.is_cancelled() {
            log::debug!("Clearing pending cancellation for the new run");
        }
        self.cancel.reset();

        log::info!(
            "Configured power {} (mass ratio {:e}), expecting {} collisions",
            power,
            self.state.mass_ratio(),
            metrics::expected_collisions(self.state.mass_ratio())
        );
        Ok(())
    }

    /// Subscribe to events and checkpoint snapshots, replacing any previous
    /// observer
    pub fn set_observer(&mut self, observer: Box<dyn Observer>) {
        self.observer = Some(observer);
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn Observer>> {
        self.observer.take()
    }

    /// Advance the experiment by one display frame.
    ///
    /// May run far more physical substeps than `frame_dt` implies: in burst
    /// mode a whole batch runs regardless of `frame_dt`.
    pub fn step(&mut self, frame_dt: f64) -> StepOutcome {
        if self.power.is_none() {
            log::warn!("step called before configure");
            return StepOutcome::Running;
        }
        if self.outcome.is_terminal() {
            return self.outcome;
        }
        if self.cancel.is_cancelled() {
            return self.finish(StepOutcome::Cancelled);
        }
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            log::warn!("Ignoring step with frame dt {frame_dt}");
            return self.outcome;
        }

        self.outer_steps += 1;

        if let Some(gap) = self.settings.coast_gap {
            let skipped = stepper::coast(&mut self.state, gap);
            if skipped > 0.0 {
                log::trace!("Coasted {skipped:.3}s");
                self.emit(SimEvent::Coasted { duration: skipped });
            }
        }

        let mode = stepper::select_mode(&self.state, &self.settings);
        let count_before = self.state.collision_count;
        let substeps_before = self.state.substeps;

        if mode == StepMode::Burst {
            let remaining =
                metrics::remaining_collisions(count_before, self.state.mass_ratio());
            if self.mode != StepMode::Burst {
                log::info!("Entering burst mode at {count_before} collisions ({remaining} to go)");
            }
            self.emit(SimEvent::BurstStarted {
                collision_count: count_before,
                remaining,
            });
        }

        let outcome = {
            let mut sink = EngineSink {
                observer: self.observer.as_mut(),
                cancel: &self.cancel,
                configured: true,
                mode,
            };
            match mode {
                StepMode::Burst => stepper::run_burst(&mut self.state, &self.settings, &mut sink),
                StepMode::Normal { substeps } => stepper::run_frame(
                    &mut self.state,
                    &self.settings,
                    frame_dt,
                    substeps,
                    &mut sink,
                ),
            }
        };
        self.mode = mode;

        if mode == StepMode::Burst {
            let substeps = (self.state.substeps - substeps_before) as u32;
            log::debug!(
                "Burst done: {substeps} substeps, collisions {} -> {}",
                count_before,
                self.state.collision_count
            );
            self.emit(SimEvent::BurstFinished {
                collision_count: self.state.collision_count,
                substeps,
            });
        }

        match outcome {
            StepOutcome::Running => {
                self.checkpoint();
                StepOutcome::Running
            }
            terminal => self.finish(terminal),
        }
    }

    /// Request termination. Seen at the next batch boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Current state for display
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.state, self.power.is_some(), self.outcome, self.mode)
    }

    /// Summary once the run has stopped
    pub fn report(&self) -> Option<RunReport> {
        let power = self.power?;
        if !self.outcome.is_terminal() {
            return None;
        }
        Some(RunReport::new(
            power,
            self.state.mass_ratio(),
            self.state.collision_count,
            self.state.substeps,
            self.outer_steps,
            self.state.time,
            self.outcome == StepOutcome::Complete,
        ))
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn power(&self) -> Option<u32> {
        self.power
    }

    pub fn outcome(&self) -> StepOutcome {
        self.outcome
    }

    /// None until configured
    pub fn mass_ratio(&self) -> Option<f64> {
        self.power.map(|_| self.state.mass_ratio())
    }

    fn finish(&mut self, outcome: StepOutcome) -> StepOutcome {
        self.outcome = outcome;
        let count = self.state.collision_count;

        match outcome {
            StepOutcome::Complete => {
                let ratio = self.state.mass_ratio();
                let estimate = metrics::pi_estimate(count, ratio);
                log::info!(
                    "Simulation complete: {} collisions (expected {}), π ≈ {:.9}, error {:.3e}",
                    count,
                    metrics::expected_collisions(ratio),
                    estimate,
                    (estimate - std::f64::consts::PI).abs()
                );
                self.emit(SimEvent::Completed {
                    collision_count: count,
                    pi_estimate: estimate,
                });
            }
            StepOutcome::Cancelled => {
                log::info!("Simulation cancelled at {count} collisions");
                self.emit(SimEvent::Cancelled {
                    collision_count: count,
                });
            }
            StepOutcome::Running => {}
        }

        self.checkpoint();
        outcome
    }

    fn emit(&mut self, event: SimEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_event(&event);
        }
    }

    fn checkpoint(&mut self) {
        if self.observer.is_some() {
            let snapshot = self.snapshot();
            if let Some(observer) = self.observer.as_mut() {
                observer.on_checkpoint(&snapshot);
            }
        }
    }
}

/// Bridges stepper callbacks to logging, events and cancellation
struct EngineSink<'a> {
    observer: Option<&'a mut Box<dyn Observer>>,
    cancel: &'a CancelHandle,
    configured: bool,
    mode: StepMode,
}

impl EngineSink<'_> {
    fn emit(&mut self, event: SimEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_event(&event);
        }
    }
}

impl StepSink for EngineSink<'_> {
    fn resolved(&mut self, state: &SimState, resolution: &Resolution) {
        // Number each collision in the order the passes ran
        let mut count = state.collision_count - resolution.collisions();

        if resolution.wall_hit {
            count += 1;
            log::debug!("Wall collision {count}");
            self.emit(SimEvent::WallCollision { count });
        }

        if let Some(p) = resolution.penetration {
            if p.reflected {
                count += 1;
            }
            log::warn!(
                "Light block found behind the wall at {:.3}, forced back (reflected: {})",
                p.position,
                p.reflected
            );
            self.emit(SimEvent::WallPenetrationCorrected {
                position: p.position,
                reflected: p.reflected,
            });
        }

        if let Some(hit) = resolution.body_hit {
            count += 1;
            log::debug!(
                "Block collision {count}: v = ({:.6}, {:.6}) -> ({:.6}, {:.6})",
                hit.before.0,
                hit.before.1,
                hit.after.0,
                hit.after.1
            );
            self.emit(SimEvent::BodyCollision {
                count,
                before: hit.before,
                after: hit.after,
            });
            if hit.clamped_at_wall {
                log::trace!(
                    "Separation clamped at wall, heavy block moved to {:.3}",
                    state.right.position
                );
                self.emit(SimEvent::ClampedAtWall {
                    right_position: state.right.position,
                });
            }
        }

        if let Some((left_position, right_position)) = resolution.ordering_recovered {
            log::warn!(
                "Light block passed through the heavy block ({left_position:.3} > {right_position:.3}), blocks re-separated"
            );
            self.emit(SimEvent::OrderingRecovered {
                left_position,
                right_position,
            });
        }
    }

    fn checkpoint(&mut self, state: &SimState) -> bool {
        if let Some(observer) = self.observer.as_mut() {
            let snapshot =
                Snapshot::capture(state, self.configured, StepOutcome::Running, self.mode);
            observer.on_checkpoint(&snapshot);
        }
        !self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FRAME_DT: f64 = 1.0 / 60.0;

    /// Records events and checks invariants at every checkpoint
    #[derive(Default)]
    struct Recorder {
        events: Vec<SimEvent>,
        checkpoints: usize,
        violations: usize,
        cancel_at_checkpoint: Option<(usize, CancelHandle)>,
    }

    impl Observer for Recorder {
        fn on_event(&mut self, event: &SimEvent) {
            self.events.push(event.clone());
        }

        fn on_checkpoint(&mut self, snapshot: &Snapshot) {
            self.checkpoints += 1;
            if snapshot.left_position < snapshot.wall_position
                || snapshot.left_position + snapshot.body_width > snapshot.right_position
            {
                self.violations += 1;
            }
            if let Some((n, handle)) = &self.cancel_at_checkpoint {
                if self.checkpoints == *n {
                    handle.cancel();
                }
            }
        }
    }

    /// Step until terminal, checking invariants and monotonicity after
    /// every call
    fn run_to_end(engine: &mut Engine, frame_dt: f64, max_calls: u64) -> StepOutcome {
        let mut last_count = engine.state().collision_count;
        for _ in 0..max_calls {
            let outcome = engine.step(frame_dt);
            let state = engine.state();
            assert!(
                state.invariants_hold(),
                "invariant broken: left {} right {}",
                state.left.position,
                state.right.position
            );
            assert!(state.collision_count >= last_count);
            last_count = state.collision_count;
            if outcome.is_terminal() {
                return outcome;
            }
        }
        panic!("run did not finish within {max_calls} steps");
    }

    fn coasting(power: u32) -> Engine {
        let settings = Settings {
            coast_gap: Some(1.0),
            ..Settings::default()
        };
        let mut engine = Engine::new(settings).unwrap();
        engine.configure(power).unwrap();
        engine
    }

    #[test]
    fn test_configure_rejects_out_of_range() {
        let mut engine = Engine::new(Settings::default()).unwrap();
        assert!(matches!(
            engine.configure(0),
            Err(SimError::InvalidConfiguration(_))
        ));
        assert!(engine.configure(10).is_err());
        assert!(engine.power().is_none());
        assert!(engine.configure(9).is_ok());
        assert_eq!(engine.mass_ratio(), Some(1e16));
    }

    #[test]
    fn test_parse_power() {
        assert_eq!(parse_power(" 4 \n").unwrap(), 4);
        assert!(parse_power("3.5").is_err());
        assert!(parse_power("abc").is_err());
        assert!(parse_power("").is_err());
        assert!(parse_power("-2").is_err());
        assert!(parse_power("99999999999999999999").is_err());
    }

    #[test]
    fn test_configure_sets_initial_state() {
        let engine = Engine::with_power(3).unwrap();
        let state = engine.state();
        assert_eq!(state.left.mass, 1.0);
        assert_eq!(state.right.mass, 10_000.0);
        assert_eq!(state.left.velocity, 0.0);
        assert!(state.right.velocity < 0.0);
        assert_eq!(state.collision_count, 0);

        let snap = engine.snapshot();
        assert_eq!(snap.expected_collisions, Some(314));
        assert_eq!(snap.pi_estimate, Some(0.0));
        assert_eq!(snap.outcome, StepOutcome::Running);
    }

    #[test]
    fn test_unconfigured_engine() {
        let mut engine = Engine::new(Settings::default()).unwrap();
        let snap = engine.snapshot();
        assert!(snap.expected_collisions.is_none());
        assert!(snap.pi_estimate.is_none());
        assert_eq!(engine.step(FRAME_DT), StepOutcome::Running);
        assert_eq!(engine.state().substeps, 0);
        assert!(engine.report().is_none());
    }

    #[test]
    fn test_snapshot_is_idempotent() {
        let mut engine = Engine::with_power(3).unwrap();
        // Run into the collision-dense part, right after a burst batch
        for _ in 0..1000 {
            engine.step(FRAME_DT);
            let snap = engine.snapshot();
            if snap.collision_count > 0 && snap.mode == StepMode::Burst {
                break;
            }
        }
        let a = engine.snapshot();
        let b = engine.snapshot();
        assert_eq!(a, b);
        assert!(a.collision_count > 0);
        assert_eq!(a.mode, StepMode::Burst);
        assert_eq!(a.outcome, StepOutcome::Running);
    }

    #[test]
    fn test_bad_frame_dt_is_ignored() {
        let mut engine = Engine::with_power(2).unwrap();
        assert_eq!(engine.step(f64::NAN), StepOutcome::Running);
        assert_eq!(engine.step(-1.0), StepOutcome::Running);
        assert_eq!(engine.state().substeps, 0);
    }

    #[test]
    fn test_power_1_counts_3() {
        let mut engine = Engine::with_power(1).unwrap();
        assert_eq!(run_to_end(&mut engine, FRAME_DT, 10_000), StepOutcome::Complete);
        assert_eq!(engine.state().collision_count, 3);
        // Equal masses end with the velocities handed over
        assert!(engine.state().left.velocity.abs() < 1e-12);
        assert!((engine.state().right.velocity - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_power_2_counts_31() {
        let mut engine = Engine::with_power(2).unwrap();
        assert_eq!(run_to_end(&mut engine, FRAME_DT, 10_000), StepOutcome::Complete);
        assert_eq!(engine.state().collision_count, 31);
    }

    #[test]
    fn test_power_3_counts_314() {
        let mut engine = Engine::with_power(3).unwrap();
        assert_eq!(run_to_end(&mut engine, FRAME_DT, 100_000), StepOutcome::Complete);
        let report = engine.report().unwrap();
        assert_eq!(report.collision_count, 314);
        assert!(report.is_exact());
        assert!(report.complete);
        assert!((report.pi_estimate - 3.14).abs() < 1e-12);
    }

    #[test]
    fn test_powers_4_and_5_exact() {
        for (power, expected) in [(4, 3141), (5, 31415)] {
            let mut engine = Engine::with_power(power).unwrap();
            assert_eq!(run_to_end(&mut engine, FRAME_DT, 1_000_000), StepOutcome::Complete);
            assert_eq!(engine.state().collision_count, expected, "power {power}");
        }
    }

    #[test]
    fn test_complete_is_sticky() {
        let mut engine = Engine::with_power(1).unwrap();
        run_to_end(&mut engine, FRAME_DT, 10_000);
        let substeps = engine.state().substeps;
        assert_eq!(engine.step(FRAME_DT), StepOutcome::Complete);
        assert_eq!(engine.state().substeps, substeps);
    }

    #[test]
    fn test_events_conserve_momentum_and_energy() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut engine = Engine::with_power(3).unwrap();
        engine.set_observer(Box::new(recorder.clone()));
        run_to_end(&mut engine, FRAME_DT, 100_000);

        let (m1, m2) = (engine.state().left.mass, engine.state().right.mass);
        let recorder = recorder.borrow();
        let mut body_hits = 0;
        let mut wall_hits = 0;
        let mut last_count = 0;
        for event in &recorder.events {
            match *event {
                SimEvent::BodyCollision {
                    count,
                    before,
                    after,
                } => {
                    body_hits += 1;
                    assert!(count > last_count);
                    last_count = count;
                    let p0 = m1 * before.0 + m2 * before.1;
                    let p1 = m1 * after.0 + m2 * after.1;
                    assert!((p0 - p1).abs() < 1e-9 * m2 * 50.0);
                    let e0 = m1 * before.0 * before.0 + m2 * before.1 * before.1;
                    let e1 = m1 * after.0 * after.0 + m2 * after.1 * after.1;
                    assert!((e0 - e1).abs() < 1e-9 * m2 * 2500.0);
                }
                SimEvent::WallCollision { count } => {
                    wall_hits += 1;
                    assert!(count > last_count);
                    last_count = count;
                }
                _ => {}
            }
        }
        assert_eq!(body_hits + wall_hits, 314);
        assert_eq!(last_count, 314);
        assert!(matches!(
            recorder.events.last(),
            Some(SimEvent::Completed {
                collision_count: 314,
                ..
            })
        ));
    }

    #[test]
    fn test_no_corrections_at_default_resolution() {
        // Any correction here means the substeps are too coarse
        for power in 1..=4 {
            let recorder = Rc::new(RefCell::new(Recorder::default()));
            let mut engine = Engine::with_power(power).unwrap();
            engine.set_observer(Box::new(recorder.clone()));
            run_to_end(&mut engine, FRAME_DT, 1_000_000);

            let recorder = recorder.borrow();
            let corrections = recorder.events.iter().filter(|e| e.is_correction()).count();
            assert_eq!(corrections, 0, "power {power}");
            assert_eq!(recorder.violations, 0);
        }
    }

    #[test]
    fn test_burst_mode_used_for_dense_runs() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut engine = Engine::with_power(4).unwrap();
        engine.set_observer(Box::new(recorder.clone()));
        run_to_end(&mut engine, FRAME_DT, 1_000_000);

        let recorder = recorder.borrow();
        let bursts = recorder
            .events
            .iter()
            .filter(|e| matches!(e, SimEvent::BurstStarted { .. }))
            .count();
        assert!(bursts > 0);
        // Burst checkpoints on top of one per step
        assert!(recorder.checkpoints as u64 > engine.report().unwrap().outer_steps);
    }

    #[test]
    fn test_cancel_between_steps() {
        let mut engine = Engine::with_power(3).unwrap();
        engine.step(FRAME_DT);
        engine.cancel();
        assert_eq!(engine.step(FRAME_DT), StepOutcome::Cancelled);
        assert_eq!(engine.step(FRAME_DT), StepOutcome::Cancelled);
        let report = engine.report().unwrap();
        assert!(!report.complete);
        assert_eq!(engine.snapshot().outcome, StepOutcome::Cancelled);
    }

    #[test]
    fn test_cancel_mid_burst() {
        let mut engine = Engine::with_power(5).unwrap();
        // Run until the first burst
        while !matches!(stepper::select_mode(engine.state(), engine.settings()), StepMode::Burst) {
            assert_eq!(engine.step(FRAME_DT), StepOutcome::Running);
        }

        let recorder = Rc::new(RefCell::new(Recorder {
            cancel_at_checkpoint: Some((1, engine.cancel_handle())),
            ..Recorder::default()
        }));
        engine.set_observer(Box::new(recorder.clone()));

        let substeps = engine.state().substeps;
        assert_eq!(engine.step(FRAME_DT), StepOutcome::Cancelled);
        // Stopped at the first checkpoint, not the end of the batch
        assert_eq!(engine.state().substeps - substeps, 500);
        assert!(engine.state().invariants_hold());
    }

    #[test]
    fn test_reconfigure_resets_run() {
        let mut engine = Engine::with_power(2).unwrap();
        engine.cancel();
        engine.step(FRAME_DT);
        engine.configure(1).unwrap();
        assert_eq!(engine.outcome(), StepOutcome::Running);
        assert_eq!(engine.state().collision_count, 0);
        assert_eq!(run_to_end(&mut engine, FRAME_DT, 10_000), StepOutcome::Complete);
        assert_eq!(engine.state().collision_count, 3);
    }

    #[test]
    fn test_configure_clears_pending_cancel() {
        let mut engine = Engine::new(Settings::default()).unwrap();
        let handle = engine.cancel_handle();
        engine.cancel();
        engine.configure(2).unwrap();
        assert!(!handle.is_cancelled());
        assert_eq!(engine.step(FRAME_DT), StepOutcome::Running);

        // A cancel after configure still applies to the run
        handle.cancel();
        assert_eq!(engine.step(FRAME_DT), StepOutcome::Cancelled);
    }

    #[test]
    fn test_coasting_keeps_counts() {
        for (power, expected) in [(1, 3), (2, 31), (3, 314), (4, 3141), (5, 31415)] {
            let mut engine = coasting(power);
            assert_eq!(run_to_end(&mut engine, FRAME_DT, 1_000_000), StepOutcome::Complete);
            assert_eq!(engine.state().collision_count, expected, "power {power}");
        }
    }

    #[test]
    fn test_coasting_power_6_and_7_terminate() {
        for (power, expected) in [(6, 314_159), (7, 3_141_592)] {
            let mut engine = coasting(power);
            assert_eq!(run_to_end(&mut engine, FRAME_DT, 1_000_000), StepOutcome::Complete);
            let report = engine.report().unwrap();
            assert_eq!(report.collision_count, expected, "power {power}");
            assert!(report.absolute_error < 1e-5);
        }
    }

    #[test]
    #[ignore = "millions of outer steps without coasting"]
    fn test_power_6_without_coasting() {
        let mut engine = Engine::with_power(6).unwrap();
        assert_eq!(run_to_end(&mut engine, FRAME_DT, 20_000_000), StepOutcome::Complete);
        assert_eq!(engine.state().collision_count, 314_159);
    }

    /// Near the f64 precision limit the count is allowed to drift; the
    /// estimate must still land close to π
    fn assert_extreme_ratio_terminates(power: u32) {
        let mut engine = coasting(power);
        assert_eq!(run_to_end(&mut engine, FRAME_DT, 10_000_000), StepOutcome::Complete);
        let report = engine.report().unwrap();
        assert!(report.absolute_error < 1e-6, "power {power}: {report:?}");
    }

    #[test]
    fn test_coasting_power_8_terminates() {
        assert_extreme_ratio_terminates(8);
    }

    #[test]
    #[ignore = "about a minute of substeps"]
    fn test_coasting_power_9_terminates() {
        assert_extreme_ratio_terminates(9);
    }
}
