//! Expected collision count and running π estimate

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// floor(π·√ratio), the collision count of the ideal system
#[inline]
pub fn expected_collisions(mass_ratio: f64) -> u64 {
    (PI * mass_ratio.sqrt()).floor() as u64
}

/// count / √ratio, converges on π as the run completes
#[inline]
pub fn pi_estimate(collision_count: u64, mass_ratio: f64) -> f64 {
    collision_count as f64 / mass_ratio.sqrt()
}

/// Collisions still to come before the ideal count is reached
#[inline]
pub fn remaining_collisions(collision_count: u64, mass_ratio: f64) -> u64 {
    expected_collisions(mass_ratio).saturating_sub(collision_count)
}

/// Summary of a run, available once it has stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub power: u32,
    pub mass_ratio: f64,
    pub collision_count: u64,
    pub expected_collisions: u64,
    pub pi_estimate: f64,
    /// |estimate - π|
    pub absolute_error: f64,
    /// Physics substeps taken
    pub substeps: u64,
    /// `step` calls that did work
    pub outer_steps: u64,
    /// Elapsed physical time
    pub physical_time: f64,
    /// False when the run was cancelled before completing
    pub complete: bool,
}

impl RunReport {
    pub fn new(
        power: u32,
        mass_ratio: f64,
        collision_count: u64,
        substeps: u64,
        outer_steps: u64,
        physical_time: f64,
        complete: bool,
    ) -> Self {
        let estimate = pi_estimate(collision_count, mass_ratio);
        Self {
            power,
            mass_ratio,
            collision_count,
            expected_collisions: expected_collisions(mass_ratio),
            pi_estimate: estimate,
            absolute_error: (estimate - PI).abs(),
            substeps,
            outer_steps,
            physical_time,
            complete,
        }
    }

    /// Collision count matches floor(π·√ratio)
    pub fn is_exact(&self) -> bool {
        self.collision_count == self.expected_collisions
    }
}
