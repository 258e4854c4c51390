//! Point-mass block

use serde::{Deserialize, Serialize};

/// A block sliding on the floor. `position` is its left edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: f64,
    /// Signed, negative means toward the wall
    pub velocity: f64,
    pub mass: f64,
    /// Fixed at construction
    width: f64,
}

impl Body {
    pub fn new(position: f64, velocity: f64, mass: f64, width: f64) -> Self {
        Self {
            position,
            velocity,
            mass,
            width,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Right edge (position + width)
    #[inline]
    pub fn right_edge(&self) -> f64 {
        self.position + self.width
    }

    pub fn momentum(&self) -> f64 {
        self.mass * self.velocity
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity * self.velocity
    }

    /// Advance position by `velocity * dt`.
    ///
    /// With a wall, a move toward the wall that would end behind it stops
    /// exactly at the wall no matter how large the step. Velocity is left
    /// for the collision pass to reflect.
    pub fn update_position(&mut self, dt: f64, wall: Option<f64>) {
        let dx = self.velocity * dt;
        match wall {
            Some(wall_x) if dx < 0.0 => {
                let new_x = self.position + dx;
                self.position = if new_x < wall_x { wall_x } else { new_x };
            }
            _ => self.position += dx,
        }
    }

    /// True if the speed is below `epsilon`
    #[inline]
    pub fn is_at_rest(&self, epsilon: f64) -> bool {
        self.velocity.abs() < epsilon
    }
}
