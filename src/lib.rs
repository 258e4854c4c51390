//! Pi Collide - counting π with elastic collisions
//!
//! A light block sits between a wall and a heavy block sliding toward it.
//! With masses 1 and 100^(n-1) the number of collisions is the first n
//! digits of π.
//!
//! Core modules:
//! - `sim`: Collision engine (bodies, resolver, adaptive stepping, metrics)
//! - `settings`: Tunable constants, loadable from JSON
//! - `error`: Crate-wide error type

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{Result, SimError};
pub use settings::Settings;
pub use sim::{Engine, Snapshot, StepOutcome};

/// Experiment configuration constants
pub mod consts {
    /// Smallest accepted power (mass ratio 1)
    pub const MIN_POWER: u32 = 1;
    /// Largest accepted power (mass ratio 10^16)
    pub const MAX_POWER: u32 = 9;
    /// Mass of the light block, fixed for every run
    pub const LEFT_MASS: f64 = 1.0;

    /// Geometry defaults
    pub const WALL_POSITION: f64 = 50.0;
    pub const BODY_WIDTH: f64 = 50.0;
    pub const LEFT_START: f64 = 200.0;
    pub const RIGHT_START: f64 = 400.0;
    /// Speed of the heavy block toward the wall at start
    pub const INITIAL_SPEED: f64 = 50.0;
    /// Gap left between the blocks after every block-block collision
    pub const SEPARATION_MARGIN: f64 = 5.0;

    /// Burst mode defaults
    pub const BURST_SUBSTEPS: u32 = 2000;
    pub const BURST_DT: f64 = 1.0 / 60000.0;
    /// Substeps between cancellation/snapshot checkpoints inside a burst
    pub const CHECKPOINT_INTERVAL: u32 = 500;
    /// Burst mode is only worth it with more than this many collisions to go
    pub const BURST_MIN_REMAINING: u64 = 50;
    pub const BURST_SPEED_EPSILON: f64 = 0.01;

    /// Normal mode defaults
    pub const REST_EPSILON: f64 = 0.001;
    /// Per-frame substep cap to bound frame cost
    pub const MAX_SUBSTEPS_PER_FRAME: u32 = 50;
    /// Substeps used when the mass ratio is below every table threshold
    pub const BASE_SUBSTEPS: u32 = 20;
    /// (mass ratio threshold, substeps per frame), highest threshold first
    pub const SUBSTEP_TABLE: [(f64, u32); 6] = [
        (1e7, 2000),
        (1e6, 1500),
        (1e4, 1000),
        (1e3, 500),
        (1e2, 200),
        (10.0, 50),
    ];

    /// Default display frame time (60 Hz)
    pub const FRAME_DT: f64 = 1.0 / 60.0;
}

/// Mass of the heavy block for a given power: 100^(power-1)
#[inline]
pub fn mass_for_power(power: u32) -> f64 {
    100f64.powi(power.saturating_sub(1) as i32)
}
