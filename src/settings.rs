//! Experiment settings
//!
//! Every tunable constant of the collision engine. Defaults reproduce the
//! classic setup; a JSON file may override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Result, SimError};

/// One row of the normal-mode substep table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubstepTier {
    /// Applies when the mass ratio is at least this value
    pub min_ratio: f64,
    /// Substeps per display frame
    pub substeps: u32,
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Geometry ===
    pub wall_position: f64,
    /// Width of both blocks
    pub body_width: f64,
    /// Initial left edge of the light block
    pub left_start: f64,
    /// Initial left edge of the heavy block
    pub right_start: f64,
    /// Speed of the heavy block toward the wall at start (positive)
    pub initial_speed: f64,
    /// Gap forced between the blocks after each block-block collision
    pub separation_margin: f64,

    // === Burst mode ===
    /// Substeps per burst batch
    pub burst_substeps: u32,
    /// Fixed substep size inside a burst
    pub burst_dt: f64,
    /// Substeps between checkpoints (cancellation + snapshot)
    pub checkpoint_interval: u32,
    /// Burst only while more than this many collisions remain
    pub burst_min_remaining: u64,
    /// Both speeds must exceed this to enter burst mode
    pub burst_speed_epsilon: f64,

    // === Normal mode ===
    /// Both speeds below this ends the run
    pub rest_epsilon: f64,
    pub max_substeps_per_frame: u32,
    pub base_substeps: u32,
    /// Ordered highest threshold first
    pub substep_table: Vec<SubstepTier>,

    // === Coasting ===
    /// Skip quiet stretches until the nearest contact gap is this small.
    /// Off when None.
    pub coast_gap: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wall_position: WALL_POSITION,
            body_width: BODY_WIDTH,
            left_start: LEFT_START,
            right_start: RIGHT_START,
            initial_speed: INITIAL_SPEED,
            separation_margin: SEPARATION_MARGIN,

            burst_substeps: BURST_SUBSTEPS,
            burst_dt: BURST_DT,
            checkpoint_interval: CHECKPOINT_INTERVAL,
            burst_min_remaining: BURST_MIN_REMAINING,
            burst_speed_epsilon: BURST_SPEED_EPSILON,

            rest_epsilon: REST_EPSILON,
            max_substeps_per_frame: MAX_SUBSTEPS_PER_FRAME,
            base_substeps: BASE_SUBSTEPS,
            substep_table: SUBSTEP_TABLE
                .iter()
                .map(|&(min_ratio, substeps)| SubstepTier {
                    min_ratio,
                    substeps,
                })
                .collect(),

            coast_gap: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse and validate settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that the settings describe a valid starting configuration
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("body_width", self.body_width),
            ("initial_speed", self.initial_speed),
            ("separation_margin", self.separation_margin),
            ("burst_dt", self.burst_dt),
            ("burst_speed_epsilon", self.burst_speed_epsilon),
            ("rest_epsilon", self.rest_epsilon),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::invalid(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("wall_position", self.wall_position),
            ("left_start", self.left_start),
            ("right_start", self.right_start),
        ] {
            if !value.is_finite() {
                return Err(SimError::invalid(format!("{name} must be finite")));
            }
        }

        // Starting layout must already satisfy the positional invariants
        if self.left_start < self.wall_position {
            return Err(SimError::invalid("left block starts behind the wall"));
        }
        if self.left_start + self.body_width > self.right_start {
            return Err(SimError::invalid("blocks overlap at start"));
        }

        for (name, value) in [
            ("burst_substeps", self.burst_substeps),
            ("checkpoint_interval", self.checkpoint_interval),
            ("max_substeps_per_frame", self.max_substeps_per_frame),
            ("base_substeps", self.base_substeps),
        ] {
            if value == 0 {
                return Err(SimError::invalid(format!("{name} must be > 0")));
            }
        }

        if let Some(gap) = self.coast_gap {
            if !gap.is_finite() || gap <= 0.0 {
                return Err(SimError::invalid(format!(
                    "coast_gap must be finite and > 0, got {gap}"
                )));
            }
        }

        let mut previous = f64::INFINITY;
        for tier in &self.substep_table {
            if !tier.min_ratio.is_finite() || tier.min_ratio >= previous {
                return Err(SimError::invalid(
                    "substep_table must be ordered by strictly decreasing min_ratio",
                ));
            }
            if tier.substeps == 0 {
                return Err(SimError::invalid("substep_table entries must be > 0"));
            }
            previous = tier.min_ratio;
        }

        Ok(())
    }

    /// Substeps per frame for a mass ratio, before the per-frame cap
    pub fn substeps_for_ratio(&self, mass_ratio: f64) -> u32 {
        self.substep_table
            .iter()
            .find(|tier| mass_ratio >= tier.min_ratio)
            .map(|tier| tier.substeps)
            .unwrap_or(self.base_substeps)
    }

    /// Substeps actually run per normal-mode frame
    pub fn frame_substeps(&self, mass_ratio: f64) -> u32 {
        self.substeps_for_ratio(mass_ratio).min(self.max_substeps_per_frame)
    }
}
