//! Structured simulation events
//!
//! Corrections and run transitions are reported here instead of being
//! printed. The engine hands each event to its observer and keeps nothing.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::state::Snapshot;

/// Something worth reporting happened during stepping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Light block bounced off the wall
    WallCollision { count: u64 },
    /// Blocks collided; velocities are (left, right)
    BodyCollision {
        count: u64,
        before: (f64, f64),
        after: (f64, f64),
    },
    /// Light block was found behind the wall and put back
    WallPenetrationCorrected { position: f64, reflected: bool },
    /// Separation after a block collision hit the wall; heavy block moved
    ClampedAtWall { right_position: f64 },
    /// Light block was right of the heavy block without overlapping it
    OrderingRecovered {
        left_position: f64,
        right_position: f64,
    },
    /// Quiet stretch skipped in one move
    Coasted { duration: f64 },
    BurstStarted { collision_count: u64, remaining: u64 },
    BurstFinished { collision_count: u64, substeps: u32 },
    Completed { collision_count: u64, pi_estimate: f64 },
    Cancelled { collision_count: u64 },
}

impl SimEvent {
    /// Invariant-restoring corrections. Any of these in a run means the
    /// substeps were too coarse.
    pub fn is_correction(&self) -> bool {
        matches!(
            self,
            SimEvent::WallPenetrationCorrected { .. } | SimEvent::OrderingRecovered { .. }
        )
    }
}

/// Receives engine events and checkpoint snapshots
pub trait Observer {
    fn on_event(&mut self, _event: &SimEvent) {}

    /// Called at every burst checkpoint and at the end of each `step`
    fn on_checkpoint(&mut self, _snapshot: &Snapshot) {}
}

/// Records every event
impl Observer for Vec<SimEvent> {
    fn on_event(&mut self, event: &SimEvent) {
        self.push(event.clone());
    }
}

/// Shared observer; the caller keeps a clone to read it back
impl<O: Observer> Observer for Rc<RefCell<O>> {
    fn on_event(&mut self, event: &SimEvent) {
        self.borrow_mut().on_event(event);
    }

    fn on_checkpoint(&mut self, snapshot: &Snapshot) {
        self.borrow_mut().on_checkpoint(snapshot);
    }
}
