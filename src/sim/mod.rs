//! Deterministic collision simulation
//!
//! Two blocks on a frictionless line next to a wall. Everything here is
//! pure and deterministic:
//! - No randomness
//! - No rendering or platform dependencies
//! - Identical inputs give identical collision counts

pub mod body;
pub mod collision;
pub mod engine;
pub mod event;
pub mod metrics;
pub mod state;
pub mod stepper;

pub use body::Body;
pub use collision::{BodyHit, Penetration, Resolution, elastic_velocities};
pub use engine::{CancelHandle, Engine, parse_power};
pub use event::{Observer, SimEvent};
pub use metrics::{RunReport, expected_collisions, pi_estimate};
pub use state::{SimState, Snapshot, StepMode, StepOutcome};
