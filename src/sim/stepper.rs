//! Adaptive stepping
//!
//! Each outer step picks how finely to cut physical time so that the
//! resolver sees at most about one collision per substep:
//! - Burst: many collisions still to come and both blocks moving. Runs a
//!   fixed batch of tiny substeps with checkpoints every few hundred.
//! - Normal: the frame dt split into a mass-ratio dependent number of
//!   substeps, good for watching the last collisions.
//!
//! Both modes share the same substep primitive and stop the moment no
//! further collision is possible.

use super::collision::{self, Resolution};
use super::metrics;
use super::state::{SimState, StepMode, StepOutcome};
use crate::settings::Settings;

/// Receives what happens inside a batch
pub trait StepSink {
    /// A substep's resolver pass did something
    fn resolved(&mut self, _state: &SimState, _resolution: &Resolution) {}

    /// Burst checkpoint. Return false to stop the batch (cancellation).
    fn checkpoint(&mut self, _state: &SimState) -> bool {
        true
    }
}

/// Discards everything
impl StepSink for () {}

/// Pick the stepping strategy for the next outer step
pub fn select_mode(state: &SimState, settings: &Settings) -> StepMode {
    let ratio = state.mass_ratio();
    let remaining = metrics::remaining_collisions(state.collision_count, ratio);
    let eps = settings.burst_speed_epsilon;
    let both_moving = !state.left.is_at_rest(eps) && !state.right.is_at_rest(eps);

    if remaining > settings.burst_min_remaining && both_moving {
        StepMode::Burst
    } else {
        StepMode::Normal {
            substeps: settings.frame_substeps(ratio),
        }
    }
}

/// One substep: wall-aware move of the light block, free move of the heavy
/// block, then collision resolution
#[inline]
pub fn substep(state: &mut SimState, dt: f64, separation: f64) -> Resolution {
    let wall = state.wall_position;
    state.left.update_position(dt, Some(wall));
    state.right.update_position(dt, None);
    state.substeps += 1;
    state.time += dt;
    collision::resolve(state, separation)
}

/// Fixed batch of fine substeps
pub fn run_burst(
    state: &mut SimState,
    settings: &Settings,
    sink: &mut dyn StepSink,
) -> StepOutcome {
    let total = settings.burst_substeps;
    let interval = settings.checkpoint_interval;

    for i in 1..=total {
        let resolution = substep(state, settings.burst_dt, settings.separation_margin);
        if !resolution.is_quiet() {
            sink.resolved(state, &resolution);
        }
        if state.is_finished(settings.burst_speed_epsilon) {
            return StepOutcome::Complete;
        }
        if i % interval == 0 && i < total && !sink.checkpoint(state) {
            return StepOutcome::Cancelled;
        }
    }

    StepOutcome::Running
}

/// One display frame split into `substeps` equal substeps
pub fn run_frame(
    state: &mut SimState,
    settings: &Settings,
    frame_dt: f64,
    substeps: u32,
    sink: &mut dyn StepSink,
) -> StepOutcome {
    let dt = frame_dt / f64::from(substeps);

    for _ in 0..substeps {
        let resolution = substep(state, dt, settings.separation_margin);
        if !resolution.is_quiet() {
            sink.resolved(state, &resolution);
        }
        if state.is_finished(settings.rest_epsilon) {
            return StepOutcome::Complete;
        }
    }

    StepOutcome::Running
}

/// Time until the nearest possible contact is within `gap`, if any.
///
/// Wall contact needs the light block moving toward the wall, block
/// contact needs the blocks closing in.
pub fn time_to_contact(state: &SimState, gap: f64) -> Option<f64> {
    let mut best = f64::INFINITY;

    if state.left.velocity < 0.0 {
        let distance = state.left.position - state.wall_position - gap;
        best = best.min((distance / -state.left.velocity).max(0.0));
    }

    let closing = state.left.velocity - state.right.velocity;
    if closing > 0.0 {
        let distance = state.right.position - state.left.right_edge() - gap;
        best = best.min((distance / closing).max(0.0));
    }

    best.is_finite().then_some(best)
}

/// Move both blocks straight to the point where the nearest contact gap is
/// `gap`. No collision can happen on the way. Returns the time skipped.
pub fn coast(state: &mut SimState, gap: f64) -> f64 {
    match time_to_contact(state, gap) {
        Some(t) if t > 0.0 => {
            state.left.position += state.left.velocity * t;
            state.right.position += state.right.velocity * t;
            state.time += t;
            t
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mass_for_power;

    fn state_for(power: u32) -> SimState {
        SimState::new(&Settings::default(), mass_for_power(power))
    }

    /// Counts corrections seen by the sink
    #[derive(Default)]
    struct Tally {
        resolutions: usize,
        corrections: usize,
        checkpoints: usize,
        stop_after: Option<usize>,
    }

    impl StepSink for Tally {
        fn resolved(&mut self, _state: &SimState, resolution: &Resolution) {
            self.resolutions += 1;
            if resolution.penetration.is_some() || resolution.ordering_recovered.is_some() {
                self.corrections += 1;
            }
        }

        fn checkpoint(&mut self, _state: &SimState) -> bool {
            self.checkpoints += 1;
            self.stop_after.is_none_or(|n| self.checkpoints < n)
        }
    }

    #[test]
    fn test_starts_in_normal_mode() {
        // Light block at rest: nothing to burst through yet
        let state = state_for(3);
        assert_eq!(
            select_mode(&state, &Settings::default()),
            StepMode::Normal { substeps: 50 }
        );
    }

    #[test]
    fn test_burst_when_collision_dense() {
        let mut state = state_for(3);
        state.left.velocity = -99.0;
        assert_eq!(select_mode(&state, &Settings::default()), StepMode::Burst);

        // Few collisions left: back to normal
        state.collision_count = 300;
        assert!(matches!(
            select_mode(&state, &Settings::default()),
            StepMode::Normal { .. }
        ));
    }

    #[test]
    fn test_no_burst_for_small_ratios() {
        let mut state = state_for(2);
        state.left.velocity = -20.0;
        assert_eq!(
            select_mode(&state, &Settings::default()),
            StepMode::Normal { substeps: 50 }
        );

        let state = state_for(1);
        assert_eq!(
            select_mode(&state, &Settings::default()),
            StepMode::Normal { substeps: 20 }
        );
    }

    #[test]
    fn test_substep_advances_time() {
        let mut state = state_for(1);
        let r = substep(&mut state, 0.5, 5.0);
        assert!(r.is_quiet());
        assert_eq!(state.right.position, 375.0);
        assert_eq!(state.substeps, 1);
        assert_eq!(state.time, 0.5);
    }

    #[test]
    fn test_frames_count_equal_masses() {
        let settings = Settings::default();
        let mut state = state_for(1);
        let mut sink = Tally::default();
        let mut outcome = StepOutcome::Running;
        for _ in 0..10_000 {
            let substeps = match select_mode(&state, &settings) {
                StepMode::Normal { substeps } => substeps,
                StepMode::Burst => panic!("burst mode at ratio 1"),
            };
            outcome = run_frame(&mut state, &settings, 1.0 / 60.0, substeps, &mut sink);
            if outcome.is_terminal() {
                break;
            }
        }
        assert_eq!(outcome, StepOutcome::Complete);
        assert_eq!(state.collision_count, 3);
        assert!((1..=3).contains(&sink.resolutions));
        assert_eq!(sink.corrections, 0);
        assert!(state.invariants_hold());
    }

    #[test]
    fn test_burst_checkpoints_and_stop() {
        let settings = Settings::default();
        let mut state = state_for(4);
        state.left.velocity = -199.0;

        let mut sink = Tally::default();
        assert_eq!(
            run_burst(&mut state, &settings, &mut sink),
            StepOutcome::Running
        );
        // 2000 substeps, checkpoints at 500, 1000, 1500
        assert_eq!(sink.checkpoints, 3);
        assert_eq!(state.substeps, 2000);

        let mut sink = Tally {
            stop_after: Some(1),
            ..Tally::default()
        };
        assert_eq!(
            run_burst(&mut state, &settings, &mut sink),
            StepOutcome::Cancelled
        );
        assert_eq!(state.substeps, 2500);
        assert!(state.invariants_hold());
    }

    #[test]
    fn test_time_to_contact() {
        let mut state = state_for(1);
        // Heavy block closing at 50 on a 150 gap
        assert_eq!(time_to_contact(&state, 0.0), Some(3.0));
        assert_eq!(time_to_contact(&state, 10.0), Some(2.8));

        // Light block heading for the wall, 150 away at 100
        state.left.velocity = -100.0;
        state.right.velocity = -10.0;
        assert_eq!(time_to_contact(&state, 0.0), Some(1.5));

        // Nothing coming
        state.left.velocity = 10.0;
        state.right.velocity = 20.0;
        assert_eq!(time_to_contact(&state, 0.0), None);
    }

    #[test]
    fn test_coast_stops_short_of_contact() {
        let mut state = state_for(1);
        let skipped = coast(&mut state, 1.0);
        assert!((skipped - 2.98).abs() < 1e-12);
        assert!((state.right.position - state.left.right_edge() - 1.0).abs() < 1e-9);
        assert_eq!(state.collision_count, 0);
        assert!(state.invariants_hold());

        // Already within the gap: nothing to skip
        assert!(coast(&mut state, 1.0) < 1e-9);
    }

    #[test]
    fn test_coast_preserves_count() {
        let settings = Settings::default();
        let mut state = state_for(2);
        let mut sink = Tally::default();
        let mut outcome = StepOutcome::Running;
        while !outcome.is_terminal() {
            coast(&mut state, 1.0);
            let substeps = settings.frame_substeps(state.mass_ratio());
            outcome = run_frame(&mut state, &settings, 1.0 / 60.0, substeps, &mut sink);
        }
        assert_eq!(state.collision_count, 31);
        assert_eq!(sink.corrections, 0);
    }
}
