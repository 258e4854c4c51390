//! Simulation state and the read-only snapshot handed to render sinks
//!
//! The engine owns exactly one `SimState`; nothing else mutates it.

use serde::{Deserialize, Serialize};

use super::body::Body;
use super::metrics;
use crate::consts::LEFT_MASS;
use crate::settings::Settings;

/// Result of a `step` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// More collisions may follow
    Running,
    /// No further collision is possible; the count is final
    Complete,
    /// Stopped by a cancellation request
    Cancelled,
}

impl StepOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StepOutcome::Running)
    }
}

/// Stepping strategy used by the most recent `step`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepMode {
    /// Frame dt split into a mass-ratio dependent number of substeps
    Normal { substeps: u32 },
    /// Fixed batch of fine substeps, checkpoints only
    Burst,
}

/// Bodies, wall and counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Light block, between the wall and the heavy block
    pub left: Body,
    /// Heavy block
    pub right: Body,
    pub wall_position: f64,
    /// Never decreases
    pub collision_count: u64,
    /// Physics substeps run so far
    pub substeps: u64,
    /// Elapsed physical time
    pub time: f64,
}

impl SimState {
    /// Bodies at their start positions: light block at rest, heavy block
    /// moving toward the wall.
    pub fn new(settings: &Settings, right_mass: f64) -> Self {
        Self {
            left: Body::new(settings.left_start, 0.0, LEFT_MASS, settings.body_width),
            right: Body::new(
                settings.right_start,
                -settings.initial_speed,
                right_mass,
                settings.body_width,
            ),
            wall_position: settings.wall_position,
            collision_count: 0,
            substeps: 0,
            time: 0.0,
        }
    }

    pub fn mass_ratio(&self) -> f64 {
        self.right.mass / self.left.mass
    }

    /// Both blocks effectively stopped
    pub fn at_rest(&self, epsilon: f64) -> bool {
        self.left.is_at_rest(epsilon) && self.right.is_at_rest(epsilon)
    }

    /// The light block moves away from the wall and cannot catch the heavy
    /// block, so no collision of either kind can happen again.
    pub fn separating(&self) -> bool {
        self.left.velocity >= 0.0 && self.right.velocity >= self.left.velocity
    }

    /// Run is over: at rest, or no collision left to happen
    pub fn is_finished(&self, rest_epsilon: f64) -> bool {
        self.at_rest(rest_epsilon) || self.separating()
    }

    /// Both positional invariants hold
    pub fn invariants_hold(&self) -> bool {
        self.left.position >= self.wall_position && self.left.right_edge() <= self.right.position
    }

    pub fn total_momentum(&self) -> f64 {
        self.left.momentum() + self.right.momentum()
    }

    pub fn total_energy(&self) -> f64 {
        self.left.kinetic_energy() + self.right.kinetic_energy()
    }
}

/// Immutable view of the experiment for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub left_position: f64,
    pub right_position: f64,
    pub left_velocity: f64,
    pub right_velocity: f64,
    pub wall_position: f64,
    pub body_width: f64,
    pub collision_count: u64,
    /// Elapsed physical time
    pub time: f64,
    /// None until a mass ratio is configured
    pub mass_ratio: Option<f64>,
    pub expected_collisions: Option<u64>,
    pub pi_estimate: Option<f64>,
    pub outcome: StepOutcome,
    pub mode: StepMode,
}

impl Snapshot {
    pub(crate) fn capture(
        state: &SimState,
        configured: bool,
        outcome: StepOutcome,
        mode: StepMode,
    ) -> Self {
        let mass_ratio = configured.then(|| state.mass_ratio());
        Self {
            left_position: state.left.position,
            right_position: state.right.position,
            left_velocity: state.left.velocity,
            right_velocity: state.right.velocity,
            wall_position: state.wall_position,
            body_width: state.left.width(),
            collision_count: state.collision_count,
            time: state.time,
            mass_ratio,
            expected_collisions: mass_ratio.map(metrics::expected_collisions),
            pi_estimate: mass_ratio.map(|r| metrics::pi_estimate(state.collision_count, r)),
            outcome,
            mode,
        }
    }
}
